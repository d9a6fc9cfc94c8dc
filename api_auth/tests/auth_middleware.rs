use actix_web::{
    App, HttpMessage, HttpResponse, dev::Service, http::StatusCode, test, web,
};
use common::{
    error::{AppError, Res},
    firebase::FirebaseClaims,
};

fn claims(admin: bool) -> FirebaseClaims {
    FirebaseClaims {
        uid: "user-1".to_string(),
        email: Some("user@example.com".to_string()),
        name: None,
        picture: None,
        admin,
        exp: 4_102_444_800,
    }
}

async fn whoami(claims: web::ReqData<FirebaseClaims>) -> HttpResponse {
    HttpResponse::Ok().body(claims.uid.clone())
}

#[actix_web::test]
async fn missing_claims_are_unauthorized() {
    let app = test::init_service(
        App::new().service(
            web::scope("/secured")
                .wrap(api_auth::auth_middleware())
                .route("/me", web::get().to(whoami)),
        ),
    )
    .await;

    let req = test::TestRequest::get().uri("/secured/me").to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = test::read_body_json(res).await;
    assert!(body["error"].is_string());
}

#[actix_web::test]
async fn failed_verification_is_unauthorized() {
    let app = test::init_service(
        App::new()
            .wrap_fn(|req, srv| {
                req.extensions_mut().insert::<Res<FirebaseClaims>>(Err(
                    AppError::Unauthorized("Invalid token".to_string()),
                ));
                srv.call(req)
            })
            .service(
                web::scope("/secured")
                    .wrap(api_auth::auth_middleware())
                    .route("/me", web::get().to(whoami)),
            ),
    )
    .await;

    let req = test::TestRequest::get().uri("/secured/me").to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn verified_claims_reach_the_handler() {
    let app = test::init_service(
        App::new()
            .wrap_fn(|req, srv| {
                req.extensions_mut()
                    .insert::<Res<FirebaseClaims>>(Ok(claims(false)));
                srv.call(req)
            })
            .service(
                web::scope("/secured")
                    .wrap(api_auth::auth_middleware())
                    .route("/me", web::get().to(whoami)),
            ),
    )
    .await;

    let req = test::TestRequest::get().uri("/secured/me").to_request();
    let body = test::call_and_read_body(&app, req).await;
    assert_eq!(body, "user-1");
}

#[actix_web::test]
async fn admin_scope_requires_admin_claim() {
    for (admin, expected) in [(false, StatusCode::FORBIDDEN), (true, StatusCode::OK)] {
        let app = test::init_service(
            App::new()
                .wrap_fn(move |req, srv| {
                    req.extensions_mut()
                        .insert::<Res<FirebaseClaims>>(Ok(claims(admin)));
                    srv.call(req)
                })
                .service(
                    web::scope("/admin")
                        .wrap(api_auth::admin_middleware())
                        .route("/me", web::get().to(whoami)),
                ),
        )
        .await;

        let req = test::TestRequest::get().uri("/admin/me").to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), expected);
    }
}

#[actix_web::test]
async fn user_routes_reject_anonymous_requests() {
    let app = test::init_service(App::new().service(api_auth::mount_users())).await;

    for req in [
        test::TestRequest::get().uri("/users/me"),
        test::TestRequest::delete().uri("/users/me"),
        test::TestRequest::post().uri("/users/me/mockups"),
        test::TestRequest::get().uri("/users/me/mockups"),
        test::TestRequest::post().uri("/users/me/favorites/65a1b2c3d4e5f6a7b8c9d0e1"),
    ] {
        let res = test::call_service(&app, req.to_request()).await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }
}
