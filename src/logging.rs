use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use rocket::{
    fairing::{Fairing, Info, Kind},
    http::StatusClass,
    Data, Orbit, Request, Response, Rocket,
};

/// Per-request log context: a unique ID plus the arrival instant, so the
/// response line can include the handling latency.
#[derive(Debug, Copy, Clone)]
pub struct RequestTrace {
    pub id: usize,
    pub arrived: Instant,
}

impl RequestTrace {
    fn next() -> Self {
        static REQUEST_COUNTER: AtomicUsize = AtomicUsize::new(0);
        Self {
            id: REQUEST_COUNTER.fetch_add(1, Ordering::Relaxed),
            arrived: Instant::now(),
        }
    }
}

impl Display for RequestTrace {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id)
    }
}

/// A rocket fairing that logs every request and response.
#[derive(Debug, Copy, Clone)]
pub struct LoggerFairing;

#[rocket::async_trait]
impl Fairing for LoggerFairing {
    fn info(&self) -> Info {
        Info {
            name: "Logger",
            kind: Kind::Liftoff | Kind::Request | Kind::Response | Kind::Shutdown,
        }
    }

    async fn on_liftoff(&self, rocket: &Rocket<Orbit>) {
        let protocol = if rocket.config().tls_enabled() {
            "https"
        } else {
            "http"
        };
        let ip = &rocket.config().address;
        let port = &rocket.config().port;
        info!("Server launched on {protocol}://{ip}:{port}");
    }

    async fn on_request(&self, req: &mut Request<'_>, _data: &mut Data<'_>) {
        let trace = req.local_cache(RequestTrace::next);
        info!("->req{trace} {} {}", req.method(), req.uri());
    }

    async fn on_response<'r>(&self, req: &'r Request<'_>, res: &mut Response<'r>) {
        let trace = req.local_cache(RequestTrace::next);
        let code = res.status();
        let elapsed = trace.arrived.elapsed();
        let log_msg = format!("<-rsp{trace} {code} ({elapsed:.1?})");
        match code.class() {
            StatusClass::ServerError => error!("{log_msg}"),
            StatusClass::ClientError => warn!("{log_msg}"),
            _ => info!("{log_msg}"),
        }
    }

    async fn on_shutdown(&self, _rocket: &Rocket<Orbit>) {
        warn!("Shutdown requested, stopping gracefully...");
    }
}
