//! LMS HTTP API, mounted under `/lms/api`
//!
//! Handlers lock the store only for the synchronous database work. The
//! payment gateway is always called with the lock released.

use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use super::models::{Course, Lesson, PublicQuiz, QuizOutcome, QuizResult, Role, User};
use super::store::LmsStore;
use crate::payments::{
    CheckoutRequest, CouponValidation, CreateLinkRequest, CreateLinkResponse, PaymentGateway,
    ValidateCouponRequest, validate_coupon,
};
use crate::server::error::{ApiError, not_found, parse_json};

pub const ERR_MISSING_FIELDS: &str = "Missing required fields";
pub const ERR_GATEWAY_NOT_CONFIGURED: &str = "Payment gateway not configured";
pub const ERR_LINK_FAILED: &str = "Failed to create payment link";

pub struct LmsState {
    pub store: Mutex<LmsStore>,
    pub gateway: Option<Arc<dyn PaymentGateway>>,
}

pub fn lms_router(state: Arc<LmsState>) -> Router {
    let api = Router::new()
        .route("/courses", get(list_courses))
        .route("/courses/{id}", get(get_course))
        .route("/lessons/{id}", get(get_lesson))
        .route("/quizzes/{id}", get(get_quiz))
        .route("/quizzes/{id}/submit", post(submit_quiz))
        .route("/users", post(create_user))
        .route("/users/{id}", get(get_user))
        .route("/users/{id}/results", get(user_results))
        .route("/parents/link", post(link_parent))
        .route("/parents/{id}/children", get(children))
        .route("/payments/validate-coupon", post(validate_coupon_handler))
        .route("/payments/create-link", post(create_link));

    Router::new()
        .nest("/lms/api", api)
        .fallback(not_found)
        .with_state(state)
}

// ========== Catalog ==========

#[derive(Serialize)]
pub struct CourseDetail {
    #[serde(flatten)]
    pub course: Course,
    pub lessons: Vec<Lesson>,
}

async fn list_courses(State(state): State<Arc<LmsState>>) -> Result<Json<Vec<Course>>, ApiError> {
    let store = state.store.lock().await;
    Ok(Json(store.list_courses(true)?))
}

async fn get_course(
    State(state): State<Arc<LmsState>>,
    Path(id): Path<String>,
) -> Result<Json<CourseDetail>, ApiError> {
    let store = state.store.lock().await;
    let course = store
        .get_course(&id)?
        .ok_or_else(|| ApiError::not_found("Course not found"))?;
    let lessons = store.lessons_for_course(&id)?;
    Ok(Json(CourseDetail { course, lessons }))
}

async fn get_lesson(State(state): State<Arc<LmsState>>, Path(id): Path<String>) -> Result<Json<Lesson>, ApiError> {
    let store = state.store.lock().await;
    store
        .get_lesson(&id)?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Lesson not found"))
}

// ========== Quizzes ==========

async fn get_quiz(State(state): State<Arc<LmsState>>, Path(id): Path<String>) -> Result<Json<PublicQuiz>, ApiError> {
    let store = state.store.lock().await;
    store
        .public_quiz(&id)?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Quiz not found"))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitQuizRequest {
    #[serde(default, alias = "user_id")]
    pub user_id: String,
    #[serde(default)]
    pub answers: HashMap<String, String>,
}

async fn submit_quiz(
    State(state): State<Arc<LmsState>>,
    Path(id): Path<String>,
    payload: Result<Json<SubmitQuizRequest>, JsonRejection>,
) -> Result<Json<QuizOutcome>, ApiError> {
    let request = parse_json(payload)?;
    if request.user_id.trim().is_empty() {
        return Err(ApiError::bad_request("userId is required"));
    }

    let store = state.store.lock().await;
    let outcome = store.submit_quiz(&id, &request.user_id, &request.answers)?;
    tracing::info!(
        quiz = %id,
        user = %request.user_id,
        score = outcome.score,
        xp = outcome.xp_awarded,
        "Quiz submitted"
    );
    Ok(Json(outcome))
}

// ========== Users ==========

/// A user with their derived level
#[derive(Serialize)]
pub struct UserView {
    #[serde(flatten)]
    pub user: User,
    pub level: i64,
}

impl From<User> for UserView {
    fn from(user: User) -> Self {
        let level = user.level();
        Self { user, level }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub email: String,
    #[serde(default, alias = "first_name")]
    pub first_name: String,
    #[serde(default, alias = "last_name")]
    pub last_name: String,
    #[serde(default)]
    pub role: Option<String>,
}

/// Stable id derived from an email address
pub fn user_id_from_email(email: &str) -> String {
    email
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect()
}

async fn create_user(
    State(state): State<Arc<LmsState>>,
    payload: Result<Json<CreateUserRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<UserView>), ApiError> {
    let request = parse_json(payload)?;
    if request.first_name.trim().is_empty() || request.last_name.trim().is_empty() {
        return Err(ApiError::bad_request("firstName and lastName are required"));
    }
    if !request.email.contains('@') {
        return Err(ApiError::bad_request("A valid email is required"));
    }

    let role = match request.role.as_deref() {
        Some(r) => r.parse::<Role>()?,
        None => Role::default(),
    };
    let id = request
        .id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| user_id_from_email(&request.email));

    let user = User {
        id,
        email: request.email,
        first_name: request.first_name,
        last_name: request.last_name,
        role,
        xp: 0,
        created_at: None,
    };

    let store = state.store.lock().await;
    let created = store.create_user(&user)?;
    tracing::info!(user = %created.id, role = %created.role, "User created");
    Ok((StatusCode::CREATED, Json(created.into())))
}

async fn get_user(State(state): State<Arc<LmsState>>, Path(id): Path<String>) -> Result<Json<UserView>, ApiError> {
    let store = state.store.lock().await;
    store
        .get_user(&id)?
        .map(|u| Json(u.into()))
        .ok_or_else(|| ApiError::not_found("User not found"))
}

async fn user_results(
    State(state): State<Arc<LmsState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<QuizResult>>, ApiError> {
    let store = state.store.lock().await;
    if store.get_user(&id)?.is_none() {
        return Err(ApiError::not_found("User not found"));
    }
    Ok(Json(store.results_for_user(&id)?))
}

// ========== Parent accounts ==========

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkRequest {
    #[serde(default, alias = "parent_id")]
    pub parent_id: String,
    #[serde(default, alias = "child_id")]
    pub child_id: String,
}

async fn link_parent(
    State(state): State<Arc<LmsState>>,
    payload: Result<Json<LinkRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<LinkRequest>), ApiError> {
    let request = parse_json(payload)?;
    if request.parent_id.is_empty() || request.child_id.is_empty() {
        return Err(ApiError::bad_request("parentId and childId are required"));
    }

    let store = state.store.lock().await;
    store.link_parent_child(&request.parent_id, &request.child_id)?;
    Ok((StatusCode::CREATED, Json(request)))
}

async fn children(
    State(state): State<Arc<LmsState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<UserView>>, ApiError> {
    let store = state.store.lock().await;
    if store.get_user(&id)?.is_none() {
        return Err(ApiError::not_found("User not found"));
    }
    let children = store.children_of(&id)?.into_iter().map(UserView::from).collect();
    Ok(Json(children))
}

// ========== Payments ==========

async fn validate_coupon_handler(
    State(state): State<Arc<LmsState>>,
    payload: Result<Json<ValidateCouponRequest>, JsonRejection>,
) -> Result<Json<CouponValidation>, ApiError> {
    let request = parse_json(payload)?;
    let store = state.store.lock().await;
    let coupon = if request.code.trim().is_empty() {
        None
    } else {
        store.get_coupon(&request.code)?
    };
    let validation = validate_coupon(&request.code, coupon.as_ref(), request.product_id.as_deref());
    tracing::debug!(code = %request.code, valid = validation.valid, "Coupon checked");
    Ok(Json(validation))
}

/// Settle the amount against the catalog price and any coupon.
fn price_checkout(store: &LmsStore, request: CreateLinkRequest) -> Result<CheckoutRequest, ApiError> {
    let course = store.get_course(&request.product_id)?;
    let (base_price, description) = match course {
        Some(course) => (course.price, course.title),
        None => (request.price, request.course_name.clone()),
    };
    if base_price <= 0 {
        return Err(ApiError::bad_request("Invalid price"));
    }

    let coupon_code = request.coupon_code.filter(|c| !c.trim().is_empty());
    let amount = match coupon_code.as_deref() {
        Some(code) => {
            let coupon = store.get_coupon(code)?;
            let validation = validate_coupon(code, coupon.as_ref(), Some(&request.product_id));
            match (validation.valid, validation.coupon) {
                (true, Some(info)) => info.discount().apply(base_price),
                _ => {
                    let message = validation
                        .error
                        .unwrap_or_else(|| crate::payments::coupons::ERR_UNKNOWN.to_string());
                    return Err(ApiError::bad_request(message));
                }
            }
        }
        None => base_price,
    };

    Ok(CheckoutRequest {
        product_id: request.product_id,
        description,
        amount,
        first_name: request.first_name,
        last_name: request.last_name,
        email: request.email,
        phone: request.phone.filter(|p| !p.trim().is_empty()),
        coupon_code,
    })
}

async fn create_link(
    State(state): State<Arc<LmsState>>,
    payload: Result<Json<CreateLinkRequest>, JsonRejection>,
) -> Result<Json<CreateLinkResponse>, ApiError> {
    let request = parse_json(payload)?;
    let missing = [&request.product_id, &request.first_name, &request.last_name, &request.email]
        .iter()
        .any(|field| field.trim().is_empty());
    if missing || !request.email.contains('@') {
        return Err(ApiError::bad_request(ERR_MISSING_FIELDS));
    }

    let Some(gateway) = state.gateway.clone() else {
        return Err(ApiError::new(StatusCode::SERVICE_UNAVAILABLE, ERR_GATEWAY_NOT_CONFIGURED));
    };

    // Pricing and the coupon reservation share one lock section so two
    // requests cannot both take the last use.
    let checkout = {
        let store = state.store.lock().await;
        let checkout = price_checkout(&store, request)?;
        if let Some(code) = checkout.coupon_code.as_deref() {
            if !store.reserve_coupon_use(code)? {
                return Err(ApiError::bad_request(crate::payments::coupons::ERR_EXHAUSTED));
            }
        }
        checkout
    };

    let url = match gateway.create_checkout(&checkout).await {
        Ok(url) => url,
        Err(e) => {
            tracing::error!(product = %checkout.product_id, "Payment link creation failed: {}", e);
            if let Some(code) = checkout.coupon_code.as_deref() {
                let store = state.store.lock().await;
                if let Err(e) = store.release_coupon_use(code) {
                    tracing::warn!("Could not release reserved use of coupon {}: {}", code, e);
                }
            }
            return Err(ApiError::new(StatusCode::BAD_GATEWAY, ERR_LINK_FAILED));
        }
    };

    tracing::info!(
        product = %checkout.product_id,
        amount = checkout.amount,
        "Payment link created"
    );
    Ok(Json(CreateLinkResponse {
        payment_url: Some(url),
        error: None,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lms::store::tests::seed_quiz;
    use crate::payments::{Coupon, DiscountType};
    use crate::test_support::helpers::spawn_app;
    use async_trait::async_trait;

    struct FakeGateway {
        fail: bool,
        delay: Option<std::time::Duration>,
        calls: std::sync::Mutex<Vec<CheckoutRequest>>,
    }

    impl FakeGateway {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(Self {
                fail,
                delay: None,
                calls: std::sync::Mutex::new(Vec::new()),
            })
        }

        fn slow(delay: std::time::Duration) -> Arc<Self> {
            Arc::new(Self {
                fail: false,
                delay: Some(delay),
                calls: std::sync::Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl PaymentGateway for FakeGateway {
        async fn create_checkout(&self, request: &CheckoutRequest) -> crate::Result<String> {
            self.calls.lock().unwrap().push(request.clone());
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail {
                Err(crate::Error::Upstream("gateway down".to_string()))
            } else {
                Ok(format!("https://pay.test/checkout/{}", request.product_id))
            }
        }
    }

    fn seeded_store() -> LmsStore {
        let store = LmsStore::open_in_memory().unwrap();
        seed_quiz(&store);
        store
            .upsert_coupon(&Coupon {
                code: "SUMMER20".to_string(),
                discount_type: DiscountType::Percent,
                discount_value: 20.0,
                product_id: None,
                active: true,
                max_uses: Some(1),
                times_used: 0,
                expires_at: None,
                expired: false,
            })
            .unwrap();
        store
    }

    async fn spawn_lms(gateway: Option<Arc<dyn PaymentGateway>>) -> (String, Arc<LmsState>) {
        let state = Arc::new(LmsState {
            store: Mutex::new(seeded_store()),
            gateway,
        });
        let base = spawn_app(lms_router(state.clone())).await;
        (format!("{}/lms/api", base), state)
    }

    async fn post_json(url: String, body: serde_json::Value) -> reqwest::Response {
        reqwest::Client::new().post(url).json(&body).send().await.unwrap()
    }

    fn link_body(coupon: Option<&str>) -> serde_json::Value {
        serde_json::json!({
            "productId": "minecraft",
            "courseName": "מיינקראפט",
            "price": 1,
            "firstName": "Dana",
            "lastName": "Levi",
            "email": "dana@example.com",
            "couponCode": coupon,
        })
    }

    #[test]
    fn test_user_id_from_email() {
        assert_eq!(user_id_from_email(" Dana.Levi@Example.com "), "dana-levi-example-com");
    }

    #[tokio::test]
    async fn test_catalog_endpoints() {
        let (api, _) = spawn_lms(None).await;

        let courses: serde_json::Value = reqwest::get(format!("{}/courses", api)).await.unwrap().json().await.unwrap();
        assert_eq!(courses.as_array().unwrap().len(), 1);
        assert_eq!(courses[0]["id"], "minecraft");

        let course: serde_json::Value = reqwest::get(format!("{}/courses/minecraft", api))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(course["price"], 497);
        assert_eq!(course["lessons"][0]["id"], "mc-1");

        let missing = reqwest::get(format!("{}/courses/nope", api)).await.unwrap();
        assert_eq!(missing.status(), 404);

        let lesson = reqwest::get(format!("{}/lessons/mc-1", api)).await.unwrap();
        assert_eq!(lesson.status(), 200);
    }

    #[tokio::test]
    async fn test_quiz_hides_answer_key() {
        let (api, _) = spawn_lms(None).await;
        let text = reqwest::get(format!("{}/quizzes/mc-quiz", api)).await.unwrap().text().await.unwrap();
        assert!(text.contains("q1-a"));
        assert!(!text.contains("isCorrect"));
        assert!(!text.contains("is_correct"));
    }

    #[tokio::test]
    async fn test_quiz_submission_awards_xp_once() {
        let (api, _) = spawn_lms(None).await;

        let created = post_json(
            format!("{}/users", api),
            serde_json::json!({"email": "kid@example.com", "firstName": "Noa", "lastName": "Cohen"}),
        )
        .await;
        assert_eq!(created.status(), 201);
        let user: serde_json::Value = created.json().await.unwrap();
        let user_id = user["id"].as_str().unwrap().to_string();
        assert_eq!(user["level"], 1);

        let answers = serde_json::json!({"userId": user_id, "answers": {"q1": "q1-a", "q2": "q2-b"}});
        let first: serde_json::Value = post_json(format!("{}/quizzes/mc-quiz/submit", api), answers.clone())
            .await
            .json()
            .await
            .unwrap();
        assert_eq!(first["score"], 100);
        assert_eq!(first["passed"], true);
        assert_eq!(first["xpAwarded"], 40);

        let second: serde_json::Value = post_json(format!("{}/quizzes/mc-quiz/submit", api), answers)
            .await
            .json()
            .await
            .unwrap();
        assert_eq!(second["xpAwarded"], 0);
        assert_eq!(second["totalXp"], 40);

        let results: serde_json::Value = reqwest::get(format!("{}/users/{}/results", api, user_id))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(results.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_submit_unknown_user_is_404() {
        let (api, _) = spawn_lms(None).await;
        let resp = post_json(
            format!("{}/quizzes/mc-quiz/submit", api),
            serde_json::json!({"userId": "ghost", "answers": {}}),
        )
        .await;
        assert_eq!(resp.status(), 404);
    }

    #[tokio::test]
    async fn test_parent_link_roles() {
        let (api, _) = spawn_lms(None).await;
        for (id, role) in [("mom", "parent"), ("kid", "student"), ("other", "student")] {
            let resp = post_json(
                format!("{}/users", api),
                serde_json::json!({"id": id, "email": format!("{}@example.com", id), "firstName": id, "lastName": "X", "role": role}),
            )
            .await;
            assert_eq!(resp.status(), 201);
        }

        let ok = post_json(format!("{}/parents/link", api), serde_json::json!({"parentId": "mom", "childId": "kid"})).await;
        assert_eq!(ok.status(), 201);

        let wrong = post_json(format!("{}/parents/link", api), serde_json::json!({"parentId": "other", "childId": "kid"})).await;
        assert_eq!(wrong.status(), 400);

        let children: serde_json::Value = reqwest::get(format!("{}/parents/mom/children", api))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(children.as_array().unwrap().len(), 1);
        assert_eq!(children[0]["id"], "kid");
    }

    #[tokio::test]
    async fn test_validate_coupon_endpoint() {
        let (api, _) = spawn_lms(None).await;

        let valid: CouponValidation = post_json(
            format!("{}/payments/validate-coupon", api),
            serde_json::json!({"code": "summer20", "productId": "minecraft"}),
        )
        .await
        .json()
        .await
        .unwrap();
        assert!(valid.valid);
        assert_eq!(valid.coupon.unwrap().discount_value, 20.0);

        let unknown = post_json(
            format!("{}/payments/validate-coupon", api),
            serde_json::json!({"code": "NOPE"}),
        )
        .await;
        assert_eq!(unknown.status(), 200);
        let unknown: CouponValidation = unknown.json().await.unwrap();
        assert!(!unknown.valid);
        assert!(unknown.error.is_some());
    }

    #[tokio::test]
    async fn test_create_link_uses_catalog_price_and_coupon() {
        let gateway = FakeGateway::new(false);
        let (api, state) = spawn_lms(Some(gateway.clone())).await;

        let resp = post_json(format!("{}/payments/create-link", api), link_body(Some("SUMMER20"))).await;
        assert_eq!(resp.status(), 200);
        let body: CreateLinkResponse = resp.json().await.unwrap();
        assert_eq!(body.payment_url.as_deref(), Some("https://pay.test/checkout/minecraft"));

        let calls = gateway.calls.lock().unwrap().clone();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].amount, 398);

        let coupon = state.store.lock().await.get_coupon("SUMMER20").unwrap().unwrap();
        assert_eq!(coupon.times_used, 1);

        // max_uses is 1
        let again = post_json(format!("{}/payments/create-link", api), link_body(Some("SUMMER20"))).await;
        assert_eq!(again.status(), 400);
        assert_eq!(gateway.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_create_link_errors() {
        let (api, _) = spawn_lms(None).await;
        let unconfigured = post_json(format!("{}/payments/create-link", api), link_body(None)).await;
        assert_eq!(unconfigured.status(), 503);

        let gateway = FakeGateway::new(true);
        let (api, state) = spawn_lms(Some(gateway.clone())).await;

        let mut missing = link_body(None);
        missing["email"] = serde_json::json!("");
        let resp = post_json(format!("{}/payments/create-link", api), missing).await;
        assert_eq!(resp.status(), 400);
        let body: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(body["error"], ERR_MISSING_FIELDS);

        let bad_coupon = post_json(format!("{}/payments/create-link", api), link_body(Some("BOGUS"))).await;
        assert_eq!(bad_coupon.status(), 400);
        assert!(gateway.calls.lock().unwrap().is_empty());

        let failed = post_json(format!("{}/payments/create-link", api), link_body(Some("SUMMER20"))).await;
        assert_eq!(failed.status(), 502);
        let body: serde_json::Value = failed.json().await.unwrap();
        assert_eq!(body["error"], ERR_LINK_FAILED);

        let coupon = state.store.lock().await.get_coupon("SUMMER20").unwrap().unwrap();
        assert_eq!(coupon.times_used, 0);
    }

    #[tokio::test]
    async fn test_single_use_coupon_survives_concurrent_links() {
        let gateway = FakeGateway::slow(std::time::Duration::from_millis(300));
        let (api, state) = spawn_lms(Some(gateway.clone())).await;

        let (first, second) = tokio::join!(
            post_json(format!("{}/payments/create-link", api), link_body(Some("SUMMER20"))),
            post_json(format!("{}/payments/create-link", api), link_body(Some("summer20"))),
        );
        let mut statuses = vec![first.status().as_u16(), second.status().as_u16()];
        statuses.sort();
        assert_eq!(statuses, vec![200, 400]);

        let rejected = if first.status() == 400 { first } else { second };
        let body: serde_json::Value = rejected.json().await.unwrap();
        assert_eq!(body["error"], crate::payments::coupons::ERR_EXHAUSTED);

        assert_eq!(gateway.calls.lock().unwrap().len(), 1);
        let coupon = state.store.lock().await.get_coupon("SUMMER20").unwrap().unwrap();
        assert_eq!(coupon.times_used, 1);
    }

    #[tokio::test]
    async fn test_checkout_session_against_live_api() {
        use crate::checkout::{BuyerDetails, CheckoutSession, HttpPaymentApi, SubmitOutcome};

        let gateway = FakeGateway::new(false);
        let (api, _) = spawn_lms(Some(gateway.clone())).await;
        let config = crate::config::LmsSection {
            public_url: api.trim_end_matches("/lms/api").to_string(),
            ..Default::default()
        };

        let mut session = CheckoutSession::new(HttpPaymentApi::from_config(&config), "minecraft", "מיינקראפט", 497);
        assert_eq!(session.apply_coupon("summer20").await, Some(398));

        let buyer = BuyerDetails {
            first_name: "Dana".to_string(),
            last_name: "Levi".to_string(),
            email: "dana@example.com".to_string(),
            phone: None,
        };
        let outcome = session.submit(&buyer).await;
        assert_eq!(
            outcome,
            SubmitOutcome::Redirect("https://pay.test/checkout/minecraft".to_string())
        );
        assert_eq!(gateway.calls.lock().unwrap()[0].amount, 398);
    }

    #[tokio::test]
    async fn test_unknown_route_is_json_404() {
        let (api, _) = spawn_lms(None).await;
        let resp = reqwest::get(format!("{}/nothing-here", api)).await.unwrap();
        assert_eq!(resp.status(), 404);
        let body: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(body["error"], "Not found");
    }
}
