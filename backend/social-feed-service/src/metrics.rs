/// Prometheus metrics for the social feed service
///
/// Everything registers on the default registry and is exported by
/// [`serve_metrics`]. HTTP series are labelled by route pattern, never by
/// concrete path, so ids stay out of label values.
use std::rc::Rc;
use std::time::Instant;

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::{Method, StatusCode},
    Error, HttpResponse,
};
use futures::future::{ready, LocalBoxFuture, Ready};
use once_cell::sync::Lazy;
use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, TextEncoder};

use crate::error::{AppError, Result as AppResult};
use crate::models::NotificationKind;

const LATENCY_BUCKETS: &[f64] = &[0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5];

fn counter_vec(name: &str, help: &str, labels: &[&str]) -> IntCounterVec {
    let counter = IntCounterVec::new(Opts::new(name, help), labels)
        .unwrap_or_else(|e| panic!("invalid counter {}: {}", name, e));
    prometheus::default_registry()
        .register(Box::new(counter.clone()))
        .unwrap_or_else(|e| panic!("cannot register {}: {}", name, e));
    counter
}

static HTTP_REQUESTS: Lazy<IntCounterVec> = Lazy::new(|| {
    counter_vec(
        "social_feed_http_requests_total",
        "HTTP requests by route and status",
        &["method", "route", "status"],
    )
});

static HTTP_LATENCY: Lazy<HistogramVec> = Lazy::new(|| {
    let name = "social_feed_http_request_duration_seconds";
    let histogram = HistogramVec::new(
        HistogramOpts::new(name, "HTTP request latency by route")
            .buckets(LATENCY_BUCKETS.to_vec()),
        &["method", "route"],
    )
    .unwrap_or_else(|e| panic!("invalid histogram {}: {}", name, e));
    prometheus::default_registry()
        .register(Box::new(histogram.clone()))
        .unwrap_or_else(|e| panic!("cannot register {}: {}", name, e));
    histogram
});

static ENGAGEMENT_ACTIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    counter_vec(
        "social_feed_engagement_actions_total",
        "Engagement writes by action and outcome",
        &["action", "outcome"],
    )
});

static NOTIFICATIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    counter_vec(
        "social_feed_notifications_total",
        "Notification fan-out results by kind",
        &["kind", "result"],
    )
});

/// `outcome` is `created`, `removed`, `duplicate` or `noop`
pub fn record_engagement(action: &str, outcome: &str) {
    ENGAGEMENT_ACTIONS.with_label_values(&[action, outcome]).inc();
}

#[cfg(test)]
pub(crate) fn engagement_count(action: &str, outcome: &str) -> u64 {
    ENGAGEMENT_ACTIONS.with_label_values(&[action, outcome]).get()
}

/// `result` is `emitted`, `suppressed` or `dropped`
pub fn record_notification(kind: NotificationKind, result: &str) {
    NOTIFICATIONS.with_label_values(&[kind.as_str(), result]).inc();
}

#[cfg(test)]
pub(crate) fn notification_count(kind: NotificationKind, result: &str) -> u64 {
    NOTIFICATIONS.with_label_values(&[kind.as_str(), result]).get()
}

/// GET /metrics
pub async fn serve_metrics() -> AppResult<HttpResponse> {
    let encoder = TextEncoder::new();
    let mut body = Vec::new();
    encoder
        .encode(&prometheus::gather(), &mut body)
        .map_err(|e| AppError::Internal(format!("metrics encoding failed: {}", e)))?;

    Ok(HttpResponse::Ok()
        .content_type(encoder.format_type())
        .body(body))
}

/// One in-flight request, finished once its status is known
struct RequestTimer {
    method: Method,
    route: String,
    started: Instant,
}

impl RequestTimer {
    fn start(req: &ServiceRequest) -> Self {
        Self {
            method: req.method().clone(),
            route: req.match_pattern().unwrap_or_else(|| "unmatched".to_string()),
            started: Instant::now(),
        }
    }

    fn finish(self, status: StatusCode) {
        let method = self.method.as_str();
        HTTP_REQUESTS
            .with_label_values(&[method, &self.route, status.as_str()])
            .inc();
        HTTP_LATENCY
            .with_label_values(&[method, &self.route])
            .observe(self.started.elapsed().as_secs_f64());
    }
}

/// Counts requests and observes latency per route pattern
pub struct MetricsMiddleware;

impl<S, B> Transform<S, ServiceRequest> for MetricsMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = MetricsService<S>;
    type Future = Ready<std::result::Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(MetricsService {
            inner: Rc::new(service),
        }))
    }
}

pub struct MetricsService<S> {
    inner: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for MetricsService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, std::result::Result<Self::Response, Self::Error>>;

    forward_ready!(inner);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let timer = RequestTimer::start(&req);
        let inner = self.inner.clone();

        Box::pin(async move {
            let outcome = inner.call(req).await;
            timer.finish(match &outcome {
                Ok(res) => res.status(),
                Err(err) => err.as_response_error().status_code(),
            });
            outcome
        })
    }
}
