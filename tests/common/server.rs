//! Real server on an ephemeral port

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use yt_relay::Config;
use yt_relay::api::create_router;

/// A running server; aborted on drop
pub struct TestServer {
    pub addr: SocketAddr,
    handle: JoinHandle<()>,
}

impl TestServer {
    pub async fn start(config: &Config) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");

        let mut config = config.clone();
        config.server.api.public_base_url = Some(format!("http://{addr}"));
        let app = create_router(Arc::new(config));

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("serve");
        });

        Self { addr, handle }
    }

    pub fn url(&self, path_and_query: &str) -> String {
        format!("http://{}{}", self.addr, path_and_query)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// `/api/download` path for `VIDEO_URL`
pub fn download_path(format: &str, title: &str) -> String {
    format!(
        "/api/download?url={}&format={format}&title={}",
        urlencoding::encode(super::VIDEO_URL),
        urlencoding::encode(title)
    )
}
