use std::{future::Future, pin::Pin, rc::Rc};

use actix_web::{
    Error, HttpMessage,
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
};
use common::{error::AppError, firebase::get_firebase_claims_or_error};
use futures::future::{Ready, ok};

/// Gate for scopes that need a signed-in user.
///
/// Reads the verification result left by the extractor middleware and answers
/// 401 when it is missing or failed. With `require_admin`, users without the
/// `admin` claim get 403. On success the claims are exposed to handlers as
/// `web::ReqData<FirebaseClaims>`.
pub struct AuthMiddleware {
    require_admin: bool,
}

impl AuthMiddleware {
    pub fn new(require_admin: bool) -> Self {
        AuthMiddleware { require_admin }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: actix_web::body::MessageBody + 'static,
{
    type Response = ServiceResponse<actix_web::body::BoxBody>;
    type Error = Error;
    type Transform = AuthMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(AuthMiddlewareService {
            service: Rc::new(service),
            require_admin: self.require_admin,
        })
    }
}

pub struct AuthMiddlewareService<S> {
    service: Rc<S>,
    require_admin: bool,
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: actix_web::body::MessageBody + 'static,
{
    type Response = ServiceResponse<actix_web::body::BoxBody>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let srv = Rc::clone(&self.service);
        let require_admin = self.require_admin;

        Box::pin(async move {
            let claims = match get_firebase_claims_or_error(&req) {
                Ok(claims) => claims,
                Err(response) => return Ok(req.into_response(response)),
            };

            if require_admin && !claims.admin {
                log::warn!("User {} tried to access {} without admin role", claims.uid, req.path());
                let response = AppError::Forbidden(
                    "User role is not authorized to access this route".to_string(),
                )
                .to_http_response();
                return Ok(req.into_response(response));
            }

            req.extensions_mut().insert(claims);
            srv.call(req).await.map(|res| res.map_into_boxed_body())
        })
    }
}
