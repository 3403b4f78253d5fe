use axum::{
    Router,
    extract::Request,
    http::Method,
    middleware::from_fn_with_state,
    routing::{delete, get, post, put},
};
use tower::Layer;
use tower::util::{MapRequest, MapRequestLayer};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::error::ApiError;
use crate::middleware::{require_auth, require_listing_owner, require_review_owner};
use crate::session::with_session;
use crate::state::AppState;
use crate::{auth, discovery, listings, reviews};

pub fn router(state: AppState) -> Router {
    let public = Router::new()
        .route("/", get(auth::home))
        .route("/register", get(auth::register_form).post(auth::register))
        .route("/login", get(auth::login_form).post(auth::login))
        .route("/logout", get(auth::logout))
        .route("/findSite", get(discovery::find_site))
        .route("/findRoom", get(discovery::find_room))
        .route("/{kind}", get(listings::index))
        .route("/{kind}/autocomplete", get(discovery::autocomplete))
        .route("/{kind}/{id}", get(listings::show));

    let signed_in = Router::new()
        .route("/{kind}/new", get(listings::new_form))
        .route("/{kind}", post(listings::create))
        .route("/{kind}/{id}/reviews", post(reviews::create))
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    // route_layers stack with the last added outermost, so auth runs before
    // the ownership check.
    let listing_owner = Router::new()
        .route("/{kind}/{id}", put(listings::update).delete(listings::destroy))
        .route("/{kind}/{id}/edit", get(listings::edit_form))
        .route_layer(from_fn_with_state(state.clone(), require_listing_owner))
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    let review_owner = Router::new()
        .route("/{kind}/{id}/reviews/{review_id}", delete(reviews::destroy))
        .route_layer(from_fn_with_state(state.clone(), require_review_owner))
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public)
        .merge(signed_in)
        .merge(listing_owner)
        .merge(review_owner)
        .fallback(not_found)
        .layer(from_fn_with_state(state.clone(), with_session))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn not_found() -> ApiError {
    ApiError::NotFound
}

/// Browser forms can only POST. A `_method=PUT|PATCH|DELETE` query parameter
/// on a POST rewrites the method before routing; anything else passes
/// through untouched. Body-carried overrides are not honored since the body
/// cannot be consumed before routing.
pub fn method_override(mut req: Request) -> Request {
    if req.method() != Method::POST {
        return req;
    }
    let Some(query) = req.uri().query() else {
        return req;
    };
    let Some(raw) = query.split('&').find_map(|pair| pair.strip_prefix("_method=")) else {
        return req;
    };

    match raw.to_ascii_uppercase().as_str() {
        "PUT" => *req.method_mut() = Method::PUT,
        "PATCH" => *req.method_mut() = Method::PATCH,
        "DELETE" => *req.method_mut() = Method::DELETE,
        _ => {}
    }
    req
}

pub type App = MapRequest<Router, fn(Request) -> Request>;

/// The full service: method override wrapped around the router. The
/// override must sit outside the router because router-level layers run
/// after route matching, too late to change which route matches.
pub fn service(state: AppState) -> App {
    MapRequestLayer::new(method_override as fn(Request) -> Request).layer(router(state))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn post(uri: &str) -> Request {
        axum::http::Request::post(uri).body(Body::empty()).unwrap()
    }

    #[test]
    fn override_applies_to_post_with_known_verb() {
        assert_eq!(method_override(post("/sites/1?_method=DELETE")).method(), Method::DELETE);
        assert_eq!(method_override(post("/sites/1?_method=put")).method(), Method::PUT);
        assert_eq!(method_override(post("/sites/1?x=1&_method=PATCH")).method(), Method::PATCH);
    }

    #[test]
    fn override_ignores_everything_else() {
        assert_eq!(method_override(post("/sites/1")).method(), Method::POST);
        assert_eq!(method_override(post("/sites/1?_method=TRACE")).method(), Method::POST);
        assert_eq!(method_override(post("/sites/1?method=DELETE")).method(), Method::POST);

        let get = axum::http::Request::get("/sites/1?_method=DELETE")
            .body(Body::empty())
            .unwrap();
        assert_eq!(method_override(get).method(), Method::GET);
    }
}
