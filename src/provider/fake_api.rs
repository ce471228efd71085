//! Local HTTP server standing in for the streaming service in tests

use std::{sync::mpsc::Sender, thread::JoinHandle};

use rouille::{Request, Response};

pub(crate) struct FakeApi {
    pub base_url: String,
    handle: Option<JoinHandle<()>>,
    stop: Option<Sender<()>>,
}

impl FakeApi {
    pub(crate) fn start<F>(handler: F) -> Self
    where
        F: Fn(&Request) -> Response + Send + Sync + 'static,
    {
        let server = rouille::Server::new("127.0.0.1:0", handler).unwrap();
        let base_url = format!("http://{}", server.server_addr());
        let (handle, stop) = server.stoppable();
        Self {
            base_url,
            handle: Some(handle),
            stop: Some(stop),
        }
    }
}

impl Drop for FakeApi {
    fn drop(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

pub(crate) fn json(value: serde_json::Value) -> Response {
    Response::from_data("application/json", value.to_string())
}

/// `http://host:port` of the server that received the request
pub(crate) fn origin(request: &Request) -> String {
    format!("http://{}", request.header("Host").unwrap_or("127.0.0.1"))
}
