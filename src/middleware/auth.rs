use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::AUTHORIZATION,
    Error, HttpMessage, ResponseError,
};
use futures::future::LocalBoxFuture;
use std::future::{ready, Ready};
use std::rc::Rc;

use crate::config::JwtSettings;
use crate::services::auth_service::verify_token;
use crate::utils::AppError;

/// Verifica o bearer token quando presente e anexa `Claims` à requisição.
/// Sem token a requisição segue sem identidade; token inválido responde 401.
pub struct AuthMiddleware {
    jwt: Rc<JwtSettings>,
}

impl AuthMiddleware {
    pub fn new(jwt: JwtSettings) -> Self {
        Self { jwt: Rc::new(jwt) }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = AuthMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddlewareService {
            service,
            jwt: self.jwt.clone(),
        }))
    }
}

pub struct AuthMiddlewareService<S> {
    service: S,
    jwt: Rc<JwtSettings>,
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let header = match req.headers().get(AUTHORIZATION) {
            Some(value) => value.to_str().ok().map(str::to_string),
            None => {
                let fut = self.service.call(req);
                return Box::pin(async move { fut.await.map(ServiceResponse::map_into_left_body) });
            }
        };

        let token = header.as_deref().and_then(|h| h.strip_prefix("Bearer ")).map(str::trim);
        let claims = match token {
            Some(token) if !token.is_empty() => verify_token(token, &self.jwt),
            _ => Err("Invalid token format".to_string()),
        };

        match claims {
            Ok(claims) => {
                req.extensions_mut().insert(claims);
                let fut = self.service.call(req);
                Box::pin(async move { fut.await.map(ServiceResponse::map_into_left_body) })
            }
            Err(e) => {
                log::warn!("🔒 Rejected token on {}: {}", req.path(), e);
                let response = AppError::Unauthenticated("Invalid or expired token.".to_string()).error_response();
                Box::pin(async move { Ok(req.into_response(response).map_into_right_body()) })
            }
        }
    }
}
