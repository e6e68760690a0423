// src/api/rest.rs
use anyhow::{bail, Context, Result};
use axum::{
    http::{header, HeaderName, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    Router,
};
use std::any::Any;
use std::future::Future;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio_rustls::TlsAcceptor;
use tower::limit::GlobalConcurrencyLimitLayer;
use tower_http::{
    catch_panic::CatchPanicLayer,
    compression::CompressionLayer,
    cors::{AllowOrigin, CorsLayer},
    timeout::TimeoutLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{error, info};

use super::{
    handlers::system::not_found,
    listener::{serve_listener, ConnectionSettings},
    response::{ApiResponse, CODE_INTERNAL_ERROR},
    routes::api_routes,
    state::AppState,
};
use crate::config::ServerConfig;

/// 唯一允許的跨域來源
pub const ALLOWED_ORIGIN: &str = "https://github.com";

/// CORS 預檢結果的快取時間
const CORS_MAX_AGE: Duration = Duration::from_secs(12 * 60 * 60);

const EXPOSED_HEADERS: [&str; 11] = [
    "content-length",
    "accept-language",
    "dnt",
    "x-mx-reqtoken",
    "keep-alive",
    "user-agent",
    "x-requested-with",
    "if-modified-since",
    "cache-control",
    "content-type",
    "authorization",
];

pub struct RestApi {
    server_config: ServerConfig,
    state: AppState,
    tls: Option<TlsAcceptor>,
}

impl RestApi {
    pub fn new(state: AppState) -> Self {
        Self {
            server_config: state.config.server.clone(),
            state,
            tls: None,
        }
    }

    /// 啟用 HTTPS 監聽
    pub fn with_tls(mut self, acceptor: TlsAcceptor) -> Self {
        self.tls = Some(acceptor);
        self
    }

    /// 監聽 `listen_addr`（啟用 TLS 時另外監聽 `https_addr`），直到 `shutdown` 完成
    ///
    /// 關閉時停止接受新連接，等待進行中的請求處理完畢。
    pub async fn start<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = bind(&self.server_config.listen_addr).await?;
        let https_listener = match self.tls {
            Some(_) => Some(bind(&self.server_config.https_addr).await?),
            None => None,
        };
        self.serve(listener, https_listener, shutdown).await
    }

    /// 在已綁定的監聽器上服務請求，兩個監聽器共用同一個關閉訊號
    pub async fn serve<F>(
        self,
        listener: TcpListener,
        https_listener: Option<TcpListener>,
        shutdown: F,
    ) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let app = self.build_app();
        let settings = ConnectionSettings::from_config(&self.server_config);
        let (stop_tx, stop_rx) = watch::channel(false);

        let https = match (https_listener, self.tls.clone()) {
            (Some(https_listener), Some(acceptor)) => {
                info!("HTTPS 服務啟動於 {}", https_listener.local_addr()?);
                Some(tokio::spawn(serve_listener(
                    https_listener,
                    app.clone(),
                    Some(acceptor),
                    settings.clone(),
                    stop_rx.clone(),
                )))
            }
            (Some(_), None) => bail!("未配置 TLS 證書，無法啟動 HTTPS 監聽"),
            (None, _) => None,
        };

        info!(
            "REST API 服務啟動於 {}，路由前綴: {}",
            listener.local_addr()?,
            self.api_base_path()
        );

        let forward = async move {
            shutdown.await;
            let _ = stop_tx.send(true);
        };
        tokio::join!(serve_listener(listener, app, None, settings, stop_rx), forward);

        if let Some(handle) = https {
            handle.await.context("HTTPS 服務異常退出")?;
        }

        info!("REST API 服務已停止");
        Ok(())
    }

    /// `<root_router_prefix>/v1`
    pub fn api_base_path(&self) -> String {
        format!("{}/v1", self.server_config.router_prefix())
    }

    pub fn build_app(&self) -> Router {
        // 建立應用並逐層添加中間件
        let mut app = Router::new()
            .nest(&self.api_base_path(), api_routes())
            .fallback(not_found)
            .layer(CatchPanicLayer::custom(panic_response))
            .layer(
                TraceLayer::new_for_http()
                    .make_span_with(DefaultMakeSpan::new().include_headers(true))
                    .on_response(DefaultOnResponse::new().include_headers(true)),
            )
            .layer(build_cors_layer())
            .layer(CompressionLayer::new());

        if let Some(timeout) = self.server_config.request_timeout() {
            app = app.layer(TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, timeout));
        }

        // 全部路由共用同一個計數
        if self.server_config.limit_connection > 0 {
            app = app.layer(GlobalConcurrencyLimitLayer::new(
                self.server_config.limit_connection,
            ));
        }

        app.with_state(self.state.clone())
    }
}

async fn bind(addr: &str) -> Result<TcpListener> {
    TcpListener::bind(addr)
        .await
        .with_context(|| format!("無法監聽地址: {}", addr))
}

fn build_cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::ORIGIN])
        .expose_headers(EXPOSED_HEADERS.map(HeaderName::from_static))
        .allow_credentials(true)
        .allow_origin(AllowOrigin::list([HeaderValue::from_static(ALLOWED_ORIGIN)]))
        .max_age(CORS_MAX_AGE)
}

fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };
    error!("請求處理過程中發生 panic: {}", detail);

    ApiResponse::<()>::error(CODE_INTERNAL_ERROR, "internal server error").into_response()
}
