//! HTTP server implementation.

use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::mem;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use log::{debug, error, info, warn};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::signal;

use crate::parser::{find_head_end, parse_request_head, Error as ParserError, IntoPattern, Method, ParsedTarget, RequestHead};
use crate::server::config::ServerConfig;
use crate::server::error::Error;
use crate::server::middleware::{Middleware, MiddlewareHandle, MiddlewareRegistry};
use crate::server::pool::WorkerPool;
use crate::server::request::Request;
use crate::server::response::{Response, StatusCode};
use crate::server::router::Router;

/// The routing tables shared read-only by every worker once the server starts.
#[derive(Default)]
pub(crate) struct Dispatcher {
    pub router: Router,
    pub middleware: MiddlewareRegistry,
}

/// An HTTP server.
pub struct HttpServer {
    /// The server configuration.
    pub config: ServerConfig,
    pub(crate) dispatcher: Dispatcher,
}

#[derive(Debug, Clone, Copy)]
enum Hook {
    Before,
    After,
}

macro_rules! method_shortcuts {
    ($($name:ident => $method:ident),* $(,)?) => {
        $(
            #[doc = concat!("Register a handler for `", stringify!($method), "` requests on `pattern`.")]
            pub fn $name<P, F>(&mut self, pattern: P, handler: F) -> Result<(), Error>
            where
                P: IntoPattern,
                F: Fn(&mut Request, &mut Response) -> Result<(), Error> + Send + Sync + 'static,
            {
                self.add_endpoint(Method::$method, pattern, handler)
            }
        )*
    };
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            dispatcher: Dispatcher::default(),
        }
    }

    /// Register a handler for `method` on `pattern`.
    ///
    /// Fails if the pattern is malformed or the same method is already
    /// registered on an equivalent pattern.
    pub fn add_endpoint<P, F>(&mut self, method: Method, pattern: P, handler: F) -> Result<(), Error>
    where
        P: IntoPattern,
        F: Fn(&mut Request, &mut Response) -> Result<(), Error> + Send + Sync + 'static,
    {
        let pattern = pattern.into_pattern()?;
        debug!("Registering endpoint {method} {pattern}");
        self.dispatcher.router.insert(method, pattern, Arc::new(handler))
    }

    method_shortcuts!(
        get => GET,
        head => HEAD,
        post => POST,
        put => PUT,
        delete => DELETE,
        connect => CONNECT,
        options => OPTIONS,
        trace => TRACE,
        patch => PATCH,
    );

    /// Register a default-constructed middleware on `pattern`.
    pub fn add_middleware<M>(&mut self, pattern: impl IntoPattern) -> Result<MiddlewareHandle<M>, Error>
    where
        M: Middleware + Default,
    {
        self.add_middleware_with(pattern, M::default)
    }

    /// Register a middleware on `pattern`, built per request by `factory`.
    pub fn add_middleware_with<M, F>(&mut self, pattern: impl IntoPattern, factory: F) -> Result<MiddlewareHandle<M>, Error>
    where
        M: Middleware,
        F: Fn() -> M + Send + Sync + 'static,
    {
        let pattern = pattern.into_pattern()?;
        debug!("Registering middleware on {pattern}");
        Ok(self.dispatcher.middleware.register(pattern, factory))
    }

    /// Log the registered endpoints and middleware.
    fn display_server_info(&self) {
        info!("Registered endpoints:");
        for (method, pattern) in self.dispatcher.router.routes() {
            info!("  {method} {pattern}");
        }

        let middleware = self.dispatcher.middleware.entries();
        if !middleware.is_empty() {
            info!("Registered middleware:");
            for entry in middleware {
                info!("  #{index} {pattern}", index = entry.index, pattern = entry.pattern);
            }
        }
    }

    /// Set up the TCP listener.
    async fn setup_listener(&self) -> Result<TcpListener, Error> {
        let listener = TcpListener::bind(&self.config.addr).await?;
        info!("Server listening on http://{addr}", addr = self.config.addr);
        Ok(listener)
    }

    /// Run the server on a runtime of its own, blocking until SIGINT or SIGTERM.
    pub fn run(self) -> Result<(), Error> {
        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
        runtime.block_on(self.start())
    }

    /// Bind the configured address and serve until SIGINT or SIGTERM.
    pub async fn start(self) -> Result<(), Error> {
        let listener = self.setup_listener().await?;
        self.serve(listener, shutdown_signal()).await
    }

    /// Serve connections from `listener` until `shutdown` completes.
    ///
    /// Queued connections are still handled after `shutdown` fires; the call
    /// returns once every worker thread has exited.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<(), Error>
    where
        F: Future<Output = ()>,
    {
        self.display_server_info();

        let pool = WorkerPool::spawn(Arc::new(self.config), Arc::new(self.dispatcher))?;

        let addr = listener.local_addr()?;
        info!(
            "Started woof-rs {version} HTTP server at {addr} on {workers} worker threads",
            version = crate::VERSION,
            workers = pool.len(),
        );

        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                // Check for shutdown signal
                _ = &mut shutdown => {
                    info!("Shutting down server...");
                    break;
                }

                // Accept new connections
                accept_result = listener.accept() => {
                    match accept_result {
                        Ok((socket, peer)) => {
                            debug!("Accepted connection from {peer}");
                            // Waits while the job queue is full
                            if let Err(e) = pool.submit(socket).await {
                                error!("Could not queue connection from {peer}: {e}");
                                break;
                            }
                        }
                        Err(e) => {
                            if Self::handle_connection_error(e).await {
                                break;
                            }
                        }
                    }
                }
            }
        }

        info!("Waiting for queued connections to complete...");
        pool.shutdown().await;
        info!("Server shutdown complete");

        Ok(())
    }

    /// Handle connection errors.
    async fn handle_connection_error(e: std::io::Error) -> bool {
        error!("Error accepting connection: {e}");

        // If there's a critical error, signal to break the loop
        if e.kind() == std::io::ErrorKind::BrokenPipe {
            error!("Critical error accepting connection, shutting down");
            return true;
        }

        // For other errors, wait a bit before retrying
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
        false
    }

    /// Handle a single connection: read one request, dispatch it, write the
    /// response and close.
    ///
    /// Every failure is answered on the socket when possible and then
    /// returned for logging.
    pub(crate) async fn handle_connection<S>(
        socket: &mut S,
        dispatcher: &Dispatcher,
        config: &ServerConfig,
    ) -> Result<(), Error>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        // Read the request head
        let mut buf = Vec::with_capacity(config.read_buffer_size);
        let head_end = match Self::read_head(socket, &mut buf, config).await {
            Ok(Some(end)) => end,
            Ok(None) => return Ok(()),
            Err(e) => return Self::fail(socket, e).await,
        };

        let head = match parse_request_head(&buf[..head_end]) {
            Ok(head) => head,
            Err(e) => return Self::fail(socket, e.into()).await,
        };

        // Decode the target
        let mut target = ParsedTarget::parse(&head.target);
        if !target.success {
            warn!("Malformed request target {target:?}", target = head.target);
            return Self::fail(socket, Error::MalformedTarget(head.target)).await;
        }
        if target.path_segments.last().is_some_and(String::is_empty) {
            target.path_segments.pop();
        }

        // Find the endpoint
        let Some(route) = dispatcher.router.resolve(head.method, &target.path_segments) else {
            debug!("No route for {method} {path}", method = head.method, path = target.path);
            return Self::fail(socket, Error::NotFound(head.method, target.path)).await;
        };
        debug!(
            "{method} {path} matched a {kind} endpoint at depth {depth}",
            method = head.method,
            path = target.path,
            kind = if route.globstar { "globstar" } else { "exact" },
            depth = dispatcher.router.depth(route.node),
        );

        // Collect the applicable middleware, most specific first
        let middleware = dispatcher.middleware.resolve(&target.path_segments);

        let body = match Self::read_body(socket, &buf[head_end..], &head, config).await {
            Ok(body) => body,
            Err(e) => return Self::fail(socket, e).await,
        };

        let endpoint_params = route.endpoint.bind(&target.path_segments);
        let mut req = Request::new(head, target, dispatcher.middleware.len());
        req.set_body(body);
        let mut resp = Response::new();

        // One fresh instance per applicable middleware, each with its own bindings
        let mut hooks: Vec<(usize, HashMap<String, String>)> = Vec::with_capacity(middleware.len());
        for entry in &middleware {
            req.put_middleware(entry.index, entry.instantiate());
            hooks.push((entry.index, entry.bind(req.path_segments())));
        }

        let mut failure = None;

        // Only middleware whose `before` completed gets its `after`
        let mut entered = 0;
        for (index, params) in hooks.iter_mut() {
            if let Err(e) = Self::run_hook(&mut req, &mut resp, *index, params, Hook::Before) {
                failure = Some(e);
                break;
            }
            entered += 1;
        }

        if failure.is_none() {
            req.swap_params(endpoint_params);
            let handler = &route.endpoint.handler;
            if let Err(e) = contain(|| handler(&mut req, &mut resp)) {
                failure = Some(e);
            }
        }

        if let Some(e) = &failure {
            error!(
                "Request {method} {path} failed: {e}",
                method = req.method(),
                path = req.path()
            );
            resp.reset(StatusCode::INTERNAL_SERVER_ERROR);
        }

        for (index, params) in hooks[..entered].iter_mut().rev() {
            if let Err(e) = Self::run_hook(&mut req, &mut resp, *index, params, Hook::After) {
                error!("Middleware #{index} failed after {path}: {e}", path = req.path());
                resp.reset(StatusCode::INTERNAL_SERVER_ERROR);
                if failure.is_none() {
                    failure = Some(e);
                }
            }
        }

        req.drop_middlewares();
        drop(req);

        // Send the response
        socket.write_all(&resp.to_bytes()).await?;
        if let Err(e) = socket.shutdown().await {
            debug!("Failed to shut down connection: {e}");
        }

        match failure {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Read from the socket until the buffer holds a complete request head.
    ///
    /// # Returns
    ///
    /// The length of the head, or `None` if the peer closed the connection
    /// without sending anything
    async fn read_head<S>(socket: &mut S, buf: &mut Vec<u8>, config: &ServerConfig) -> Result<Option<usize>, Error>
    where
        S: AsyncRead + Unpin,
    {
        let mut chunk = vec![0; config.read_buffer_size.max(1)];
        loop {
            if let Some(end) = find_head_end(buf) {
                if end > config.max_head_size {
                    return Err(Error::HeadTooLarge(config.max_head_size));
                }
                return Ok(Some(end));
            }
            if buf.len() > config.max_head_size {
                return Err(Error::HeadTooLarge(config.max_head_size));
            }

            let n = socket.read(&mut chunk).await?;
            if n == 0 {
                if buf.is_empty() {
                    return Ok(None);
                }
                return Err(ParserError::MalformedRequestLine("incomplete request head".to_string()).into());
            }
            buf.extend_from_slice(&chunk[..n]);
        }
    }

    /// Read the body declared by Content-Length. `received` holds the bytes
    /// that arrived together with the head.
    async fn read_body<S>(
        socket: &mut S,
        received: &[u8],
        head: &RequestHead,
        config: &ServerConfig,
    ) -> Result<Vec<u8>, Error>
    where
        S: AsyncRead + Unpin,
    {
        let length = head.content_length()?;
        if length > config.max_body_size {
            return Err(Error::PayloadTooLarge(length, config.max_body_size));
        }

        let mut body = Vec::with_capacity(length);
        body.extend_from_slice(&received[..received.len().min(length)]);
        if body.len() < length {
            let start = body.len();
            body.resize(length, 0);
            socket.read_exact(&mut body[start..]).await?;
        }
        Ok(body)
    }

    /// Call one middleware hook with that middleware's own parameter bindings.
    fn run_hook(
        req: &mut Request,
        resp: &mut Response,
        index: usize,
        params: &mut HashMap<String, String>,
        hook: Hook,
    ) -> Result<(), Error> {
        let Some(mut instance) = req.take_middleware(index) else {
            return Ok(());
        };

        let previous = req.swap_params(mem::take(params));
        let outcome = contain(|| {
            match hook {
                Hook::Before => instance.before(req, resp),
                Hook::After => instance.after(req, resp),
            }
            Ok(())
        });
        *params = req.swap_params(previous);

        req.put_middleware(index, instance);
        outcome
    }

    /// Answer a request that failed before reaching its handler, then hand the error back.
    async fn fail<S>(socket: &mut S, e: Error) -> Result<(), Error>
    where
        S: AsyncWrite + Unpin,
    {
        let status = match &e {
            Error::NotFound(..) => StatusCode::NOT_FOUND,
            Error::HeadTooLarge(_) => StatusCode::REQUEST_HEADER_FIELDS_TOO_LARGE,
            Error::PayloadTooLarge(..) => StatusCode::PAYLOAD_TOO_LARGE,
            Error::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        };

        match socket.write_all(&Response::with_status(status).to_bytes()).await {
            Ok(()) => {
                if let Err(e) = socket.shutdown().await {
                    debug!("Failed to shut down connection: {e}");
                }
            }
            Err(e) => debug!("Failed to send {status} response: {e}"),
        }
        Err(e)
    }
}

/// Run `f`, turning a panic into an internal error.
fn contain(f: impl FnOnce() -> Result<(), Error>) -> Result<(), Error> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => Err(Error::InternalError(panic_message(&*payload))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("panicked: {message}")
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("panicked: {message}")
    } else {
        "panicked".to_string()
    }
}

/// Complete on Ctrl+C or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Error setting up Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Error setting up SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, initiating graceful shutdown"),
        _ = terminate => info!("Received SIGTERM, initiating graceful shutdown"),
    }
}
