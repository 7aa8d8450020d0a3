//! Fixed pool of worker threads fed through a bounded connection queue.

use std::sync::Arc;
use std::thread;

use log::{debug, error, info};
use tokio::net::TcpStream;
use tokio::runtime;
use tokio::sync::{mpsc, Mutex};

use crate::server::config::ServerConfig;
use crate::server::error::Error;
use crate::server::http_server::{Dispatcher, HttpServer};

/// A connection waiting for a worker.
type Job = std::net::TcpStream;

pub(crate) struct WorkerPool {
    jobs: mpsc::Sender<Job>,
    workers: Vec<thread::JoinHandle<()>>,
}

impl WorkerPool {
    /// Start `config.workers` threads, each driving its own single-threaded runtime.
    pub fn spawn(config: Arc<ServerConfig>, dispatcher: Arc<Dispatcher>) -> Result<Self, Error> {
        let (sender, receiver) = mpsc::channel(config.queue_capacity());
        let receiver = Arc::new(Mutex::new(receiver));

        let count = config.workers.max(1);
        let mut workers = Vec::with_capacity(count);
        for id in 0..count {
            let runtime = runtime::Builder::new_current_thread().enable_all().build()?;
            let receiver = receiver.clone();
            let config = config.clone();
            let dispatcher = dispatcher.clone();

            let handle = thread::Builder::new()
                .name(format!("woof-worker-{id}"))
                .spawn(move || {
                    runtime.block_on(worker_loop(id, receiver, dispatcher, config));
                    info!("Worker {id} stopped");
                })?;
            workers.push(handle);
        }

        Ok(Self { jobs: sender, workers })
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    /// Queue a connection, waiting while the queue is full.
    pub async fn submit(&self, socket: TcpStream) -> Result<(), Error> {
        let socket = socket.into_std()?;
        self.jobs
            .send(socket)
            .await
            .map_err(|_| Error::InternalError("worker pool has stopped".to_string()))
    }

    /// Close the queue and wait for the workers to finish what is already queued.
    pub async fn shutdown(self) {
        let Self { jobs, workers } = self;
        drop(jobs);

        let joined = tokio::task::spawn_blocking(move || {
            for worker in workers {
                if worker.join().is_err() {
                    error!("A worker thread panicked");
                }
            }
        })
        .await;

        if let Err(e) = joined {
            error!("Failed to join worker threads: {e}");
        }
    }
}

async fn worker_loop(
    id: usize,
    jobs: Arc<Mutex<mpsc::Receiver<Job>>>,
    dispatcher: Arc<Dispatcher>,
    config: Arc<ServerConfig>,
) {
    loop {
        // The lock is held only while waiting for the next job
        let job = jobs.lock().await.recv().await;
        let Some(stream) = job else {
            break;
        };

        let dispatcher = dispatcher.clone();
        let config = config.clone();
        // A panic escaping the pipeline ends this task, not the worker
        let task = tokio::spawn(async move {
            let mut socket = TcpStream::from_std(stream)?;
            HttpServer::handle_connection(&mut socket, &dispatcher, &config).await
        });

        match task.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => debug!("Worker {id}: request ended with error: {e}"),
            Err(e) => error!("Worker {id}: connection task failed: {e}"),
        }
    }
}
