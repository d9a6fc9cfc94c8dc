use std::{future::Future, pin::Pin, rc::Rc};

use actix_web::{
    Error, HttpMessage,
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
    web,
};
use futures::future::{Ready, ok};

use common::{
    error::{AppError, Res},
    firebase::{FirebaseAuth, FirebaseClaims},
};

use crate::bearer_token;

/// Verifies the bearer token, when one is sent, and stores the outcome as
/// `Res<FirebaseClaims>` in the request extensions. Rejection is left to the
/// auth middleware of the scopes that require a user.
pub struct ExtractionMiddleware {}

impl ExtractionMiddleware {
    pub fn new() -> Self {
        Self {}
    }
}

impl<S, B> Transform<S, ServiceRequest> for ExtractionMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: actix_web::body::MessageBody + 'static,
{
    type Response = ServiceResponse<actix_web::body::BoxBody>;
    type Error = Error;
    type Transform = ExtractionMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(ExtractionMiddlewareService {
            service: Rc::new(service),
        })
    }
}

pub struct ExtractionMiddlewareService<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for ExtractionMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: actix_web::body::MessageBody + 'static,
{
    type Response = ServiceResponse<actix_web::body::BoxBody>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let token = req
            .headers()
            .get("Authorization")
            .and_then(|h| h.to_str().ok())
            .and_then(bearer_token)
            .map(str::to_owned);

        let verifier = req.app_data::<web::Data<FirebaseAuth>>().cloned();
        let srv = Rc::clone(&self.service);

        Box::pin(async move {
            if let Some(token) = token {
                let claims_res: Res<FirebaseClaims> = match verifier {
                    Some(verifier) => verifier.verify_id_token(&token).await,
                    None => Err(AppError::Internal(
                        "Token verifier is not configured".to_string(),
                    )),
                };
                if let Err(e) = &claims_res {
                    log::debug!("Rejected bearer token: {}", e);
                }
                req.extensions_mut().insert::<Res<FirebaseClaims>>(claims_res);
            }
            srv.call(req).await.map(|res| res.map_into_boxed_body())
        })
    }
}
