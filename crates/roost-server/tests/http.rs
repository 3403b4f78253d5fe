//! End-to-end tests over the HTTP surface. Requests run through
//! `tower::ServiceExt::oneshot` against the full service, with a stub
//! geocoder and a recording image store standing in for the real
//! collaborators. Assertions follow the browser's view of each flow:
//! status codes, `Location` headers, the session cookie and the flash the
//! next page render reports.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use axum::response::Response;
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

use roost_api::app::{self, App};
use roost_api::geocode::{GeocodeError, Geocoder};
use roost_api::images::{ImageStore, ImageStoreError};
use roost_api::state::AppState;
use roost_db::Database;
use roost_db::models::NewListing;
use roost_types::models::{GeoPoint, ListingKind};

const PASSWORD: &str = "correct horse battery staple";

struct StubGeocoder {
    miss: AtomicBool,
}

#[async_trait]
impl Geocoder for StubGeocoder {
    async fn forward(&self, _query: &str) -> Result<Option<GeoPoint>, GeocodeError> {
        if self.miss.load(Ordering::SeqCst) {
            Ok(None)
        } else {
            Ok(Some(GeoPoint {
                longitude: 77.59,
                latitude: 12.97,
            }))
        }
    }
}

#[derive(Default)]
struct RecordingImageStore {
    released: Mutex<Vec<String>>,
}

#[async_trait]
impl ImageStore for RecordingImageStore {
    async fn release(&self, filename: &str) -> Result<(), ImageStoreError> {
        self.released.lock().unwrap().push(filename.to_string());
        Ok(())
    }
}

struct TestApp {
    app: App,
    db: Arc<Database>,
    geocoder: Arc<StubGeocoder>,
    images: Arc<RecordingImageStore>,
}

fn test_app() -> TestApp {
    let dir = std::env::temp_dir().join(format!("roost_http_test_{}", Uuid::new_v4()));
    std::fs::create_dir_all(&dir).unwrap();
    let db = Arc::new(Database::open(&dir.join("roost.db")).unwrap());
    let geocoder = Arc::new(StubGeocoder {
        miss: AtomicBool::new(false),
    });
    let images = Arc::new(RecordingImageStore::default());
    let state = AppState::new(db.clone(), geocoder.clone(), images.clone(), 7);
    TestApp {
        app: app::service(state),
        db,
        geocoder,
        images,
    }
}

async fn send(app: &App, req: Request<Body>) -> Response {
    app.clone().oneshot(req).await.unwrap()
}

fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::get(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: Value, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::post(uri).header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn put_json(uri: &str, body: Value, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::put(uri).header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn post_empty(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::post(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

/// The `name=value` pair from the response's `Set-Cookie`, ready to send
/// back as a `Cookie` header.
fn session_cookie(response: &Response) -> Option<String> {
    let value = response.headers().get(header::SET_COOKIE)?.to_str().ok()?;
    value.split(';').next().map(|pair| pair.to_string())
}

fn location(response: &Response) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .expect("redirect carries a Location header")
        .to_str()
        .unwrap()
}

async fn body_json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Registers a fresh user, which also signs them in. Returns the session
/// cookie.
async fn register(app: &App, username: &str) -> String {
    let response = send(
        app,
        post_json(
            "/register",
            json!({
                "username": username,
                "email": format!("{username}@example.com"),
                "password": PASSWORD,
            }),
            None,
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/");
    session_cookie(&response).expect("registering sets a session cookie")
}

/// Creates a site through the API and returns its id from the redirect.
async fn create_site(app: &App, cookie: &str, title: &str, images: Value) -> String {
    let response = send(
        app,
        post_json(
            "/sites",
            json!({
                "title": title,
                "description": "A quiet corner with room to breathe.",
                "location": "Bengaluru, Karnataka",
                "price": 1200,
                "images": images,
            }),
            Some(cookie),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FOUND);
    let target = location(&response).to_string();
    target.rsplit('/').next().unwrap().to_string()
}

fn seed_user(db: &Database, username: &str) -> String {
    let id = Uuid::new_v4().to_string();
    let created = db
        .create_user(&id, username, &format!("{username}@example.com"), "not-a-hash")
        .unwrap();
    assert!(created);
    id
}

fn seed_listing(db: &Database, kind: ListingKind, title: &str, author_id: &str) -> String {
    let id = Uuid::new_v4().to_string();
    db.insert_listing(
        &NewListing {
            id: &id,
            kind,
            title,
            description: "seeded",
            location: "Bengaluru, Karnataka",
            longitude: 77.59,
            latitude: 12.97,
            price: 1000,
            author_id,
        },
        &[],
    )
    .unwrap();
    id
}

// -- Sessions and auth --

#[tokio::test]
async fn anonymous_show_of_missing_listing_flashes_and_redirects() {
    let t = test_app();

    let response = send(&t.app, get("/sites/123", None)).await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/sites");
    let cookie = session_cookie(&response).expect("first contact mints a session");

    let index = send(&t.app, get("/sites", Some(&cookie))).await;
    assert_eq!(index.status(), StatusCode::OK);
    let body = body_json(index).await;
    assert_eq!(body["flash"]["level"], "error");
    assert_eq!(body["flash"]["message"], "Cannot find that site!");

    // The flash is gone after one render.
    let again = send(&t.app, get("/sites", Some(&cookie))).await;
    let body = body_json(again).await;
    assert!(body["flash"].is_null());
}

#[tokio::test]
async fn register_signs_the_user_in() {
    let t = test_app();
    let cookie = register(&t.app, "hopeful").await;

    let home = send(&t.app, get("/", Some(&cookie))).await;
    let body = body_json(home).await;
    assert_eq!(body["current_user"]["username"], "hopeful");
    assert_eq!(body["flash"]["level"], "success");
    assert_eq!(body["flash"]["message"], "Welcome!");
}

#[tokio::test]
async fn duplicate_registration_bounces_back_with_a_flash() {
    let t = test_app();
    register(&t.app, "taken").await;

    let response = send(
        &t.app,
        post_json(
            "/register",
            json!({
                "username": "taken",
                "email": "someone-else@example.com",
                "password": PASSWORD,
            }),
            None,
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/register");
    let cookie = session_cookie(&response).unwrap();

    let form = send(&t.app, get("/register", Some(&cookie))).await;
    let body = body_json(form).await;
    assert_eq!(body["flash"]["level"], "error");
    assert_eq!(
        body["flash"]["message"],
        "A user with that username or email already exists."
    );

    let home = send(&t.app, get("/", Some(&cookie))).await;
    let body = body_json(home).await;
    assert!(body["current_user"].is_null());
}

#[tokio::test]
async fn failed_login_reports_one_generic_message() {
    let t = test_app();
    register(&t.app, "real").await;

    // Unknown username and wrong password read identically.
    let response = send(
        &t.app,
        post_json(
            "/login",
            json!({ "username": "nobody", "password": PASSWORD }),
            None,
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/login");
    let cookie = session_cookie(&response).unwrap();

    let form = send(&t.app, get("/login", Some(&cookie))).await;
    let body = body_json(form).await;
    assert_eq!(body["flash"]["message"], "Invalid username or password.");

    let response = send(
        &t.app,
        post_json(
            "/login",
            json!({ "username": "real", "password": "not the password" }),
            Some(&cookie),
        ),
    )
    .await;
    assert_eq!(location(&response), "/login");
    let form = send(&t.app, get("/login", Some(&cookie))).await;
    let body = body_json(form).await;
    assert_eq!(body["flash"]["message"], "Invalid username or password.");
}

#[tokio::test]
async fn login_returns_to_the_page_that_required_auth() {
    let t = test_app();
    register(&t.app, "wanderer").await;

    let response = send(&t.app, get("/sites/new", None)).await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/login");
    let cookie = session_cookie(&response).unwrap();

    let form = send(&t.app, get("/login", Some(&cookie))).await;
    let body = body_json(form).await;
    assert_eq!(body["flash"]["message"], "You must be signed in first!");

    let login = send(
        &t.app,
        post_json(
            "/login",
            json!({ "username": "wanderer", "password": PASSWORD }),
            Some(&cookie),
        ),
    )
    .await;
    assert_eq!(login.status(), StatusCode::FOUND);
    assert_eq!(location(&login), "/sites/new");

    let home = send(&t.app, get("/", Some(&cookie))).await;
    let body = body_json(home).await;
    assert_eq!(body["current_user"]["username"], "wanderer");
    assert_eq!(body["flash"]["message"], "Welcome back!");

    // The stored destination is single use.
    send(&t.app, get("/logout", Some(&cookie))).await;
    let relogin = send(
        &t.app,
        post_json(
            "/login",
            json!({ "username": "wanderer", "password": PASSWORD }),
            Some(&cookie),
        ),
    )
    .await;
    assert_eq!(location(&relogin), "/");
}

#[tokio::test]
async fn logout_clears_the_session_user() {
    let t = test_app();
    let cookie = register(&t.app, "leaver").await;

    let response = send(&t.app, get("/logout", Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/");

    let home = send(&t.app, get("/", Some(&cookie))).await;
    let body = body_json(home).await;
    assert!(body["current_user"].is_null());
    assert_eq!(body["flash"]["message"], "Goodbye!");
}

// -- Listings --

#[tokio::test]
async fn unknown_collections_are_page_not_found() {
    let t = test_app();

    for uri in ["/bikes", "/bikes/42", "/nope/nope/nope/nope"] {
        let response = send(&t.app, get(uri, None)).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "GET {uri}");
        let body = body_json(response).await;
        assert_eq!(body["error"], "Page Not Found");
    }
}

#[tokio::test]
async fn create_requires_a_signed_in_user() {
    let t = test_app();

    let response = send(
        &t.app,
        post_json(
            "/sites",
            json!({
                "title": "Drive By",
                "description": "posted without a session",
                "location": "Bengaluru",
                "price": 100,
            }),
            None,
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/login");

    let response = send(&t.app, get("/sites/123/edit", None)).await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/login");
}

#[tokio::test]
async fn create_stamps_author_and_geometry() {
    let t = test_app();
    let cookie = register(&t.app, "author1").await;
    let id = create_site(&t.app, &cookie, "Hilltop House", json!([])).await;

    let show = send(&t.app, get(&format!("/sites/{id}"), Some(&cookie))).await;
    assert_eq!(show.status(), StatusCode::OK);
    let body = body_json(show).await;
    assert_eq!(body["flash"]["message"], "Successfully added a new site!");
    assert_eq!(body["listing"]["id"], id.as_str());
    assert_eq!(body["listing"]["title"], "Hilltop House");
    assert_eq!(body["listing"]["author_username"], "author1");
    assert_eq!(body["listing"]["geometry"]["longitude"], 77.59);
    assert_eq!(body["listing"]["geometry"]["latitude"], 12.97);
    assert_eq!(body["current_user"]["username"], "author1");
}

#[tokio::test]
async fn create_rejects_invalid_fields_with_every_problem_listed() {
    let t = test_app();
    let cookie = register(&t.app, "sloppy").await;

    let response = send(
        &t.app,
        post_json(
            "/sites",
            json!({
                "title": "",
                "description": "",
                "location": "Bengaluru",
                "price": -1,
            }),
            Some(&cookie),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(
        body["error"],
        "title must not be empty, description must not be empty, price must be greater than or equal to 0"
    );
}

#[tokio::test]
async fn create_rejects_repeated_image_filenames() {
    let t = test_app();
    let cookie = register(&t.app, "double_upload").await;

    let response = send(
        &t.app,
        post_json(
            "/sites",
            json!({
                "title": "Twice Pictured",
                "description": "same photo twice",
                "location": "Bengaluru",
                "price": 100,
                "images": [
                    { "url": "https://img.test/a.png", "filename": "uploads/a.png" },
                    { "url": "https://img.test/b.png", "filename": "uploads/a.png" },
                ],
            }),
            Some(&cookie),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "image filenames must be unique");
}

#[tokio::test]
async fn create_rejects_unmatchable_locations() {
    let t = test_app();
    let cookie = register(&t.app, "lost").await;
    t.geocoder.miss.store(true, Ordering::SeqCst);

    let response = send(
        &t.app,
        post_json(
            "/sites",
            json!({
                "title": "Nowhere House",
                "description": "off every map",
                "location": "Atlantis",
                "price": 500,
            }),
            Some(&cookie),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "location could not be geocoded");

    let index = send(&t.app, get("/sites", Some(&cookie))).await;
    let body = body_json(index).await;
    assert_eq!(body["listings"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn kinds_are_separate_collections() {
    let t = test_app();
    let cookie = register(&t.app, "keeper").await;
    let id = create_site(&t.app, &cookie, "Garden Flat", json!([])).await;

    let response = send(&t.app, get(&format!("/rooms/{id}"), Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/rooms");

    let rooms = send(&t.app, get("/rooms", Some(&cookie))).await;
    let body = body_json(rooms).await;
    assert_eq!(body["flash"]["message"], "Cannot find that room!");
    assert_eq!(body["listings"].as_array().unwrap().len(), 0);

    let sites = send(&t.app, get("/sites", Some(&cookie))).await;
    let body = body_json(sites).await;
    assert_eq!(body["listings"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn non_owners_bounce_off_update() {
    let t = test_app();
    let owner = register(&t.app, "owner1").await;
    let id = create_site(&t.app, &owner, "Mine Alone", json!([])).await;
    let rival = register(&t.app, "rival").await;

    let response = send(
        &t.app,
        put_json(
            &format!("/sites/{id}"),
            json!({
                "title": "Hijacked",
                "description": "rewritten",
                "location": "Elsewhere",
                "price": 1,
            }),
            Some(&rival),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), format!("/sites/{id}"));

    let show = send(&t.app, get(&format!("/sites/{id}"), Some(&rival))).await;
    let body = body_json(show).await;
    assert_eq!(
        body["flash"]["message"],
        "You do not have the permission to do that!"
    );
    assert_eq!(body["listing"]["title"], "Mine Alone");
}

#[tokio::test]
async fn owner_edits_round_trip_images() {
    let t = test_app();
    let cookie = register(&t.app, "renovator").await;
    let id = create_site(
        &t.app,
        &cookie,
        "Before",
        json!([
            { "url": "https://img.test/one.png", "filename": "uploads/one.png" },
            { "url": "https://img.test/two.png", "filename": "uploads/two.png" },
        ]),
    )
    .await;

    // Browser forms POST with a method override.
    let response = send(
        &t.app,
        post_json(
            &format!("/sites/{id}?_method=PUT"),
            json!({
                "title": "After",
                "description": "freshly painted",
                "location": "Bengaluru, Karnataka",
                "price": 2500,
                "images": [
                    { "url": "https://img.test/three.png", "filename": "uploads/three.png" },
                ],
                "delete_images": ["uploads/one.png"],
            }),
            Some(&cookie),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), format!("/sites/{id}"));

    let show = send(&t.app, get(&format!("/sites/{id}"), Some(&cookie))).await;
    let body = body_json(show).await;
    assert_eq!(body["flash"]["message"], "Successfully updated the site!");
    assert_eq!(body["listing"]["title"], "After");
    assert_eq!(body["listing"]["price"], 2500);
    // Geometry is untouched by an update.
    assert_eq!(body["listing"]["geometry"]["longitude"], 77.59);

    let filenames: Vec<&str> = body["listing"]["images"]
        .as_array()
        .unwrap()
        .iter()
        .map(|image| image["filename"].as_str().unwrap())
        .collect();
    assert_eq!(filenames, ["uploads/two.png", "uploads/three.png"]);

    let released = t.images.released.lock().unwrap().clone();
    assert_eq!(released, ["uploads/one.png"]);
}

#[tokio::test]
async fn method_override_delete_cascades() {
    let t = test_app();
    let owner = register(&t.app, "demolisher").await;
    let id = create_site(
        &t.app,
        &owner,
        "Condemned",
        json!([
            { "url": "https://img.test/one.png", "filename": "uploads/one.png" },
            { "url": "https://img.test/two.png", "filename": "uploads/two.png" },
        ]),
    )
    .await;

    let fan = register(&t.app, "fan").await;
    let response = send(
        &t.app,
        post_json(
            &format!("/sites/{id}/reviews"),
            json!({ "body": "Shame to see it go", "rating": 5 }),
            Some(&fan),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FOUND);
    let review_id = t.db.reviews_for_listing(&id).unwrap()[0].id.clone();

    let response = send(
        &t.app,
        post_empty(&format!("/sites/{id}?_method=DELETE"), Some(&owner)),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/sites");

    let index = send(&t.app, get("/sites", Some(&owner))).await;
    let body = body_json(index).await;
    assert_eq!(body["flash"]["message"], "Successfully deleted the site!");
    assert_eq!(body["listings"].as_array().unwrap().len(), 0);

    let gone = send(&t.app, get(&format!("/sites/{id}"), Some(&owner))).await;
    assert_eq!(gone.status(), StatusCode::FOUND);

    // Reviews fall with the listing, and its files are released.
    assert!(t.db.get_review(&review_id).unwrap().is_none());
    let released = t.images.released.lock().unwrap().clone();
    assert!(released.contains(&"uploads/one.png".to_string()));
    assert!(released.contains(&"uploads/two.png".to_string()));
}

// -- Reviews --

#[tokio::test]
async fn review_lifecycle_with_ownership() {
    let t = test_app();
    let host = register(&t.app, "hostess").await;
    let id = create_site(&t.app, &host, "Reviewed Often", json!([])).await;

    let response = send(
        &t.app,
        post_json(
            &format!("/sites/{id}/reviews"),
            json!({ "body": "Lovely", "rating": 5 }),
            None,
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/login");

    let critic = register(&t.app, "critic").await;
    let response = send(
        &t.app,
        post_json(
            &format!("/sites/{id}/reviews"),
            json!({ "body": "Lovely", "rating": 5 }),
            Some(&critic),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), format!("/sites/{id}"));

    let show = send(&t.app, get(&format!("/sites/{id}"), Some(&critic))).await;
    let body = body_json(show).await;
    assert_eq!(body["flash"]["message"], "Created new review!");
    let reviews = body["listing"]["reviews"].as_array().unwrap();
    assert_eq!(reviews.len(), 1);
    assert_eq!(reviews[0]["author_username"], "critic");
    let review_id = reviews[0]["id"].as_str().unwrap().to_string();

    // The listing's owner still cannot delete someone else's review.
    let response = send(
        &t.app,
        post_empty(
            &format!("/sites/{id}/reviews/{review_id}?_method=DELETE"),
            Some(&host),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), format!("/sites/{id}"));
    assert!(t.db.get_review(&review_id).unwrap().is_some());

    let show = send(&t.app, get(&format!("/sites/{id}"), Some(&host))).await;
    let body = body_json(show).await;
    assert_eq!(
        body["flash"]["message"],
        "You do not have the permission to do that!"
    );

    let response = send(
        &t.app,
        post_empty(
            &format!("/sites/{id}/reviews/{review_id}?_method=DELETE"),
            Some(&critic),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert!(t.db.get_review(&review_id).unwrap().is_none());

    let show = send(&t.app, get(&format!("/sites/{id}"), Some(&critic))).await;
    let body = body_json(show).await;
    assert_eq!(body["flash"]["message"], "Successfully deleted review!");
    assert_eq!(body["listing"]["reviews"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn review_delete_through_the_wrong_listing_is_a_miss() {
    let t = test_app();
    let host = register(&t.app, "two_sites").await;
    let reviewed = create_site(&t.app, &host, "Reviewed Site", json!([])).await;
    let decoy = create_site(&t.app, &host, "Decoy Site", json!([])).await;

    let critic = register(&t.app, "sneaky_critic").await;
    let response = send(
        &t.app,
        post_json(
            &format!("/sites/{reviewed}/reviews"),
            json!({ "body": "Fine", "rating": 3 }),
            Some(&critic),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FOUND);
    let review_id = t.db.reviews_for_listing(&reviewed).unwrap()[0].id.clone();

    // The review's own author addressing it under another listing gets the
    // missing-review bounce, and the review stays put.
    let response = send(
        &t.app,
        post_empty(
            &format!("/sites/{decoy}/reviews/{review_id}?_method=DELETE"),
            Some(&critic),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), format!("/sites/{decoy}"));

    let show = send(&t.app, get(&format!("/sites/{decoy}"), Some(&critic))).await;
    let body = body_json(show).await;
    assert_eq!(body["flash"]["message"], "Cannot find that review!");

    assert!(t.db.get_review(&review_id).unwrap().is_some());
    assert_eq!(t.db.reviews_for_listing(&reviewed).unwrap().len(), 1);
}

#[tokio::test]
async fn review_validation_lists_problems() {
    let t = test_app();
    let cookie = register(&t.app, "grader").await;
    let id = create_site(&t.app, &cookie, "Rated", json!([])).await;

    let response = send(
        &t.app,
        post_json(
            &format!("/sites/{id}/reviews"),
            json!({ "body": "", "rating": 9 }),
            Some(&cookie),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(
        body["error"],
        "body must not be empty, rating must be between 1 and 5"
    );
}

// -- Discovery --

#[tokio::test]
async fn autocomplete_caps_and_scopes_matches() {
    let t = test_app();
    let author = seed_user(&t.db, "seeder");
    for i in 0..25 {
        seed_listing(&t.db, ListingKind::Site, &format!("Sunny Loft {i:02}"), &author);
    }
    seed_listing(&t.db, ListingKind::Room, "Sunny Basement", &author);

    let response = send(&t.app, get("/sites/autocomplete?term=sunny", None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let entries = body.as_array().unwrap();
    assert_eq!(entries.len(), 20);
    for entry in entries {
        assert!(entry["label"].as_str().unwrap().starts_with("Sunny Loft"));
        assert!(entry["id"].is_string());
    }

    // Matching ignores case, and each kind only searches its own titles.
    let response = send(&t.app, get("/sites/autocomplete?term=SUNNY", None)).await;
    let body = body_json(response).await;
    assert_eq!(body.as_array().unwrap().len(), 20);

    let response = send(&t.app, get("/rooms/autocomplete?term=sunny", None)).await;
    let body = body_json(response).await;
    let entries = body.as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["label"], "Sunny Basement");
}

#[tokio::test]
async fn exact_title_search_jumps_to_the_listing() {
    let t = test_app();
    let author = seed_user(&t.db, "cartographer");
    let id = seed_listing(&t.db, ListingKind::Site, "Lone Cabin", &author);

    let response = send(&t.app, get("/findSite?findSite=Lone%20Cabin", None)).await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), format!("/sites/{id}"));

    // A site title never matches through the room search.
    let response = send(&t.app, get("/findRoom?findRoom=Lone%20Cabin", None)).await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/rooms");

    let response = send(&t.app, get("/findSite?findSite=Nowhere", None)).await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/sites");
    let cookie = session_cookie(&response).unwrap();

    let index = send(&t.app, get("/sites", Some(&cookie))).await;
    let body = body_json(index).await;
    assert_eq!(body["flash"]["message"], "Cannot find that site!");
}
