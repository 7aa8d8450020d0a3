//! A small woof-rs server showing greetings, typed query parameters and
//! path-scoped middleware.
//!
//! Try `curl 'http://127.0.0.1:8888/hello/fr?a=2&b=3'`.

use std::net::{IpAddr, Ipv4Addr};

use log::info;
use woof_rs::{HttpServer, Middleware, Request, Response, ServerConfig, StatusCode};

/// Counts the request headers and tags every response it wraps.
#[derive(Default)]
struct HeaderCounter {
    count: usize,
}

impl Middleware for HeaderCounter {
    fn before(&mut self, req: &mut Request, _resp: &mut Response) {
        info!("Request target {:?}", req.target_raw());
        self.count = req.headers().len();
    }

    fn after(&mut self, _req: &mut Request, resp: &mut Response) {
        resp.header("X-Foo", "Bar");
    }
}

/// Logs every request passing through.
#[derive(Default)]
struct AccessLog;

impl Middleware for AccessLog {
    fn before(&mut self, req: &mut Request, _resp: &mut Response) {
        info!("--> {} {}", req.method(), req.path());
    }

    fn after(&mut self, req: &mut Request, resp: &mut Response) {
        info!("<-- {} {} {}", req.method(), req.path(), resp.status());
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize the logger
    env_logger::init();

    let config = ServerConfig::default()
        .with_address(IpAddr::V4(Ipv4Addr::LOCALHOST))
        .with_port(8888)
        .with_workers(2);

    let mut server = HttpServer::new(config);

    let counter = server.add_middleware::<HeaderCounter>("/hello/*")?;
    server.add_middleware::<AccessLog>("/**")?;

    server.get("/hello/{lang}", move |req, resp| {
        let greeting = match req.param("lang") {
            Some("en") => "Hello",
            Some("fr") => "Salut",
            Some("pl") => "Cześć",
            Some("ru") => "Привет",
            _ => {
                resp.set_status(StatusCode::NOT_FOUND);
                return Ok(());
            }
        };

        let a: i32 = req.query_or("a", 42);
        let b: i32 = req.query_or("b", 0);
        resp.write(format!("{greeting}, {}!\n", a + b));

        if let Some(counter) = req.middleware(counter) {
            info!("{} headers", counter.count);
        }
        Ok(())
    })?;

    server.get("/hello/**", |req, resp| {
        resp.write(format!("{}\n", req.target_raw()));
        Ok(())
    })?;

    // Start the server
    server.start().await?;

    Ok(())
}
