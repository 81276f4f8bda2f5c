use std::{
    net::{IpAddr, SocketAddr},
    sync::Arc,
};

use http_body_util::Full;
use hyper::{
    body::{self, Bytes, Incoming},
    header::{HeaderValue, ACCEPT, CONTENT_TYPE},
    server::conn::http1::Builder as HyperHttpBuilder,
    service::service_fn,
    Method, Request, Response, StatusCode,
};
use hyper_util::rt::TokioIo;
use ipnet::IpNet;
use tokio::net::{TcpListener, TcpStream};
use tracing::warn;

use crate::common::{BuildError, ExporterError};
use crate::exposition::ExpositionFormat;
use crate::population::PopulationStore;
use crate::ExporterFuture;

const HEALTH_PATH: &str = "/health";

struct HttpListeningExporter {
    inner: Arc<Inner>,
}

struct Inner {
    store: PopulationStore,
    scrape_path: String,
    allowed_addresses: Option<Vec<IpNet>>,
}

impl Inner {
    fn is_allowed(&self, remote_address: &IpAddr) -> bool {
        match &self.allowed_addresses {
            Some(addresses) => addresses.iter().any(|address| address.contains(remote_address)),
            None => true,
        }
    }
}

impl HttpListeningExporter {
    async fn serve(&self, listener: std::net::TcpListener) -> Result<(), ExporterError> {
        let listener = TcpListener::from_std(listener)?;

        loop {
            let stream = match listener.accept().await {
                Ok((stream, _)) => stream,
                Err(e) => {
                    warn!(error = ?e, "Error accepting connection. Ignoring request.");
                    continue;
                }
            };

            let remote_addr = match stream.peer_addr() {
                Ok(remote_address) => remote_address.ip(),
                Err(e) => {
                    warn!(error = ?e, "Error obtaining remote address. Ignoring request.");
                    continue;
                }
            };

            self.process_stream(stream, remote_addr);
        }
    }

    fn process_stream(&self, stream: TcpStream, remote_address: IpAddr) {
        let inner = self.inner.clone();
        let service = service_fn(move |req: Request<body::Incoming>| {
            let inner = inner.clone();
            async move {
                Ok::<_, hyper::Error>(Self::handle_http_request(&inner, remote_address, &req))
            }
        });

        tokio::task::spawn(async move {
            if let Err(err) =
                HyperHttpBuilder::new().serve_connection(TokioIo::new(stream), service).await
            {
                warn!(error = ?err, "Error serving connection.");
            };
        });
    }

    fn handle_http_request(
        inner: &Inner,
        remote_address: IpAddr,
        req: &Request<Incoming>,
    ) -> Response<Full<Bytes>> {
        if !inner.is_allowed(&remote_address) {
            return Self::new_status_response(StatusCode::FORBIDDEN);
        }

        let path = req.uri().path();
        let is_scrape = path == inner.scrape_path;
        if !is_scrape && path != HEALTH_PATH {
            return Self::new_status_response(StatusCode::NOT_FOUND);
        }

        if req.method() != Method::GET && req.method() != Method::HEAD {
            return Self::new_status_response(StatusCode::METHOD_NOT_ALLOWED);
        }

        if !is_scrape {
            return Response::new("OK".into());
        }

        let accept = req.headers().get(ACCEPT).and_then(|value| value.to_str().ok());
        let format = ExpositionFormat::negotiate(accept);

        // HEAD must not take a snapshot, since that advances the shared random source.
        let body = if req.method() == Method::HEAD {
            Full::<Bytes>::default()
        } else {
            Full::new(Bytes::from(inner.store.render(format)))
        };

        let mut response = Response::new(body);
        response
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static(format.content_type()));
        response
    }

    fn new_status_response(status: StatusCode) -> Response<Full<Bytes>> {
        let mut response = Response::new(Full::<Bytes>::default());
        *response.status_mut() = status;
        response
    }
}

/// Creates an `ExporterFuture` implementing a http listener that serves the population.
///
/// # Errors
/// Will return Err if it cannot bind to the listen address
pub(crate) fn new_http_listener(
    store: PopulationStore,
    listen_address: SocketAddr,
    scrape_path: String,
    allowed_addresses: Option<Vec<IpNet>>,
) -> Result<ExporterFuture, BuildError> {
    let listener = std::net::TcpListener::bind(listen_address)
        .and_then(|listener| {
            listener.set_nonblocking(true)?;
            Ok(listener)
        })
        .map_err(|e| BuildError::FailedToCreateHTTPListener(e.to_string()))?;

    let exporter = HttpListeningExporter {
        inner: Arc::new(Inner { store, scrape_path, allowed_addresses }),
    };

    Ok(Box::pin(async move { exporter.serve(listener).await }))
}
