/// API key authentication
///
/// `ApiKeyAuth` resolves `Authorization: Bearer <key>` on every request. A
/// valid key stores the caller's [`AgentId`] in the request extensions. An
/// unknown key only marks the request; public routes ignore it, and the
/// `AgentId` extractor rejects it with 401 on routes that need a caller.
use actix_web::body::EitherBody;
use actix_web::dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::{Error, FromRequest, HttpMessage, HttpRequest};
use futures::future::LocalBoxFuture;
use std::future::{ready, Ready};
use std::rc::Rc;
use tracing::debug;
use uuid::Uuid;

use crate::error::AppError;
use crate::services::AgentService;

/// Authenticated agent stored in request extensions after auth
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgentId(pub Uuid);

/// Set when the request carried a bearer key that matches no agent
#[derive(Debug, Clone, Copy)]
struct RejectedKey;

/// Bearer key from the `Authorization` header, if any
pub fn bearer_key(req: &ServiceRequest) -> Option<String> {
    req.headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::to_string)
}

pub struct ApiKeyAuth {
    agents: AgentService,
}

impl ApiKeyAuth {
    pub fn new(agents: AgentService) -> Self {
        Self { agents }
    }
}

impl<S, B> Transform<S, ServiceRequest> for ApiKeyAuth
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = ApiKeyAuthService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(ApiKeyAuthService {
            service: Rc::new(service),
            agents: self.agents.clone(),
        }))
    }
}

pub struct ApiKeyAuthService<S> {
    service: Rc<S>,
    agents: AgentService,
}

impl<S, B> Service<ServiceRequest> for ApiKeyAuthService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let agents = self.agents.clone();

        Box::pin(async move {
            if let Some(api_key) = bearer_key(&req) {
                match agents.authenticate(&api_key).await {
                    Ok(Some(agent)) => {
                        debug!(agent_id = %agent.id, handle = %agent.handle, "request authenticated");
                        req.extensions_mut().insert(AgentId(agent.id));
                    }
                    Ok(None) => {
                        debug!(path = %req.path(), "unknown API key");
                        req.extensions_mut().insert(RejectedKey);
                    }
                    Err(err) => return Ok(req.error_response(err).map_into_right_body()),
                }
            }

            service
                .call(req)
                .await
                .map(ServiceResponse::map_into_left_body)
        })
    }
}

impl FromRequest for AgentId {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut actix_web::dev::Payload) -> Self::Future {
        let extensions = req.extensions();
        let result = match extensions.get::<AgentId>() {
            Some(agent) => Ok(*agent),
            None if extensions.get::<RejectedKey>().is_some() => {
                Err(AppError::Unauthorized("Invalid API key".to_string()).into())
            }
            None => Err(AppError::Unauthorized("Missing API key".to_string()).into()),
        };
        ready(result)
    }
}
