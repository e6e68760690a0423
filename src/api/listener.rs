//! 逐連接服務路由
//!
//! 以 hyper-util 的自動協議構建器同時處理 HTTP/1 與 HTTP/2，套用請求頭讀取超時、
//! 請求頭緩衝上限與長連接閒置超時。TLS 監聽器在接受連接後先完成握手。
//! 關閉訊號到達後停止接受新連接，已有連接在處理完當前請求後關閉。

use axum::Router;
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper::Request;
use hyper_util::rt::{TokioExecutor, TokioIo, TokioTimer};
use hyper_util::server::conn::auto::Builder;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tokio_rustls::TlsAcceptor;
use tower::ServiceExt;
use tracing::{debug, warn};

use crate::config::ServerConfig;

const TLS_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// 單個連接的協議參數
#[derive(Debug, Clone, Default)]
pub struct ConnectionSettings {
    pub header_read_timeout: Option<Duration>,
    pub max_buf_size: Option<usize>,
    pub idle_timeout: Option<Duration>,
}

impl ConnectionSettings {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            header_read_timeout: config.header_read_timeout(),
            max_buf_size: config.header_buffer_limit(),
            idle_timeout: config.idle_timeout(),
        }
    }

    fn builder(&self) -> Builder<TokioExecutor> {
        let mut builder = Builder::new(TokioExecutor::new());
        {
            let mut http1 = builder.http1();
            if let Some(timeout) = self.header_read_timeout {
                http1.timer(TokioTimer::new()).header_read_timeout(timeout);
            }
            if let Some(limit) = self.max_buf_size {
                http1.max_buf_size(limit);
            }
        }
        builder
    }
}

/// 接受連接直到 `shutdown` 變為 `true`，再等待既有連接結束
///
/// `tls` 為 `Some` 時每個連接先完成 TLS 握手。
pub async fn serve_listener(
    listener: TcpListener,
    app: Router,
    tls: Option<TlsAcceptor>,
    settings: ConnectionSettings,
    mut shutdown: watch::Receiver<bool>,
) {
    let builder = settings.builder();
    let mut connections = JoinSet::new();

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (stream, peer) = match accepted {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        warn!("接受連接失敗: {}", e);
                        tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
                        continue;
                    }
                };

                let app = app.clone();
                let builder = builder.clone();
                let idle_timeout = settings.idle_timeout;
                let stop = shutdown.clone();

                match tls.clone() {
                    Some(acceptor) => connections.spawn(async move {
                        match tokio::time::timeout(TLS_HANDSHAKE_TIMEOUT, acceptor.accept(stream)).await {
                            Ok(Ok(stream)) => serve_connection(stream, app, builder, idle_timeout, stop).await,
                            Ok(Err(e)) => debug!("TLS 握手失敗 {}: {}", peer, e),
                            Err(_) => debug!("TLS 握手超時 {}", peer),
                        }
                    }),
                    None => connections.spawn(serve_connection(stream, app, builder, idle_timeout, stop)),
                };
            }
            Some(_) = connections.join_next(), if !connections.is_empty() => {}
            _ = async { shutdown.wait_for(|stop| *stop).await.map(|_| ()) } => break,
        }
    }

    drop(listener);
    while connections.join_next().await.is_some() {}
}

async fn serve_connection<I>(
    io: I,
    app: Router,
    builder: Builder<TokioExecutor>,
    idle_timeout: Option<Duration>,
    mut shutdown: watch::Receiver<bool>,
) where
    I: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let activity = Arc::new(Activity::new());
    let tracker = Arc::clone(&activity);
    let service = service_fn(move |request: Request<Incoming>| {
        let guard = tracker.begin();
        let app = app.clone();
        async move {
            let response = app.oneshot(request).await;
            drop(guard);
            response
        }
    });

    let conn = builder.serve_connection_with_upgrades(TokioIo::new(io), service);
    tokio::pin!(conn);
    let idle = idle_expired(&activity, idle_timeout);
    tokio::pin!(idle);
    let mut closing = false;

    loop {
        tokio::select! {
            result = conn.as_mut() => {
                if let Err(e) = result {
                    debug!("連接處理結束: {}", e);
                }
                break;
            }
            _ = shutdown.wait_for(|stop| *stop), if !closing => {
                closing = true;
                conn.as_mut().graceful_shutdown();
            }
            _ = &mut idle, if !closing => {
                debug!("連接閒置超時，準備關閉");
                closing = true;
                conn.as_mut().graceful_shutdown();
            }
        }
    }
}

/// 連接上的請求活動，用於判斷閒置
struct Activity {
    in_flight: AtomicUsize,
    last_seen: Mutex<Instant>,
}

impl Activity {
    fn new() -> Self {
        Self {
            in_flight: AtomicUsize::new(0),
            last_seen: Mutex::new(Instant::now()),
        }
    }

    fn begin(self: &Arc<Self>) -> ActivityGuard {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        ActivityGuard(Arc::clone(self))
    }

    /// 有請求在處理時返回 `None`
    fn idle_deadline(&self, timeout: Duration) -> Option<Instant> {
        if self.in_flight.load(Ordering::SeqCst) > 0 {
            return None;
        }
        Some(*self.last_seen.lock() + timeout)
    }
}

struct ActivityGuard(Arc<Activity>);

impl Drop for ActivityGuard {
    fn drop(&mut self) {
        *self.0.last_seen.lock() = Instant::now();
        self.0.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

async fn idle_expired(activity: &Activity, timeout: Option<Duration>) {
    let Some(timeout) = timeout else {
        return std::future::pending().await;
    };

    loop {
        match activity.idle_deadline(timeout) {
            Some(deadline) if deadline <= Instant::now() => return,
            Some(deadline) => tokio::time::sleep_until(deadline).await,
            None => tokio::time::sleep(timeout).await,
        }
    }
}
