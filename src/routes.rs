use actix_web::{
    delete, get, middleware::from_fn, post, put,
    web::{self, Data},
    HttpResponse, Responder,
};
use validator::Validate;

use crate::{
    auth::{self, AuthUser},
    customers, db, demo,
    errors::AppError,
    leads, reports,
    structs::{
        AuthResponse, CustomerChanges, CustomerListQuery, LeadChanges, LeadListQuery, LeadStatus,
        Login, MessageResponse, NewCustomer, NewLead, PageRequest, Register, VerifyResponse,
    },
    utils, AppState,
};

/// Mounts the API handlers and routes extractor failures into [`AppError`].
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _| AppError::BadRequest(err.to_string()).into()),
    )
    .app_data(
        web::QueryConfig::default()
            .error_handler(|err, _| AppError::BadRequest(err.to_string()).into()),
    )
    .app_data(
        web::PathConfig::default()
            .error_handler(|err, _| AppError::BadRequest(err.to_string()).into()),
    )
    .service(register_handler)
    .service(login_handler)
    .service(verify_handler)
    .service(list_customers_handler)
    .service(create_customer_handler)
    .service(get_customer_handler)
    .service(update_customer_handler)
    .service(delete_customer_handler)
    .service(list_leads_handler)
    .service(create_lead_handler)
    .service(get_lead_handler)
    .service(update_lead_handler)
    .service(delete_lead_handler)
    .service(leads_by_status_handler);
}

#[get("/health")]
pub async fn health_handler() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

// Auth

#[post("/auth/register")]
pub async fn register_handler(
    web::Json(form): web::Json<Register>,
    state: Data<AppState>,
) -> Result<impl Responder, AppError> {
    form.validate()?;

    let user = db::create_user(&state, &form.name, &form.email, &form.password).await?;

    if state.seed_demo_data {
        if let Err(e) = demo::seed_demo_data(&state, user.id).await {
            log::error!("Failed to seed demo data for user {}: {}", user.id, e);
        }
    }

    let token = state.tokens.issue(user.id)?;
    Ok(HttpResponse::Created().json(AuthResponse { token, user }))
}

#[post("/auth/login")]
pub async fn login_handler(
    web::Json(form): web::Json<Login>,
    state: Data<AppState>,
) -> Result<impl Responder, AppError> {
    form.validate()?;

    let invalid = || AppError::Unauthorized("Invalid credentials".to_owned());
    let user = db::get_user_by_email(&state, &form.email)
        .await?
        .ok_or_else(invalid)?;

    match utils::verify_password(&form.password, &user.pwd_hash) {
        Ok(true) => {}
        Ok(false) => {
            log::warn!("Failed login for user {}", user.id);
            return Err(invalid());
        }
        Err(e) => {
            log::error!("Stored hash for user {} is unusable: {}", user.id, e);
            return Err(AppError::PasswordError(e.to_string()));
        }
    }

    let token = state.tokens.issue(user.id)?;
    Ok(HttpResponse::Ok().json(AuthResponse { token, user }))
}

#[get("/auth/verify", wrap = "from_fn(auth::require_user)")]
pub async fn verify_handler(user: AuthUser) -> impl Responder {
    HttpResponse::Ok().json(VerifyResponse { user: user.0 })
}

// Customers

#[get("/customers", wrap = "from_fn(auth::require_user)")]
pub async fn list_customers_handler(
    user: AuthUser,
    query: web::Query<CustomerListQuery>,
    state: Data<AppState>,
) -> Result<impl Responder, AppError> {
    let request = PageRequest::parse(query.page.as_deref(), query.limit.as_deref());
    let search = query.search.as_deref().unwrap_or_default();
    let page = customers::list_customers(&state, user.id(), request, search).await?;
    Ok(HttpResponse::Ok().json(page))
}

#[post("/customers", wrap = "from_fn(auth::require_user)")]
pub async fn create_customer_handler(
    user: AuthUser,
    web::Json(form): web::Json<NewCustomer>,
    state: Data<AppState>,
) -> Result<impl Responder, AppError> {
    form.validate()?;
    let customer = customers::create_customer(&state, user.id(), form).await?;
    Ok(HttpResponse::Created().json(customer))
}

#[get("/customers/{id}", wrap = "from_fn(auth::require_user)")]
pub async fn get_customer_handler(
    user: AuthUser,
    path: web::Path<String>,
    state: Data<AppState>,
) -> Result<impl Responder, AppError> {
    let id = utils::parse_id(&path, "customer")?;
    let customer = customers::get_customer_with_leads(&state, user.id(), id).await?;
    Ok(HttpResponse::Ok().json(customer))
}

#[put("/customers/{id}", wrap = "from_fn(auth::require_user)")]
pub async fn update_customer_handler(
    user: AuthUser,
    path: web::Path<String>,
    web::Json(form): web::Json<CustomerChanges>,
    state: Data<AppState>,
) -> Result<impl Responder, AppError> {
    let id = utils::parse_id(&path, "customer")?;
    form.validate()?;
    let customer = customers::update_customer(&state, user.id(), id, form).await?;
    Ok(HttpResponse::Ok().json(customer))
}

#[delete("/customers/{id}", wrap = "from_fn(auth::require_user)")]
pub async fn delete_customer_handler(
    user: AuthUser,
    path: web::Path<String>,
    state: Data<AppState>,
) -> Result<impl Responder, AppError> {
    let id = utils::parse_id(&path, "customer")?;
    customers::delete_customer(&state, user.id(), id).await?;
    Ok(HttpResponse::Ok().json(MessageResponse {
        message: "Customer deleted successfully".to_owned(),
    }))
}

// Leads

#[get("/customers/{customer_id}/leads", wrap = "from_fn(auth::require_user)")]
pub async fn list_leads_handler(
    user: AuthUser,
    path: web::Path<String>,
    query: web::Query<LeadListQuery>,
    state: Data<AppState>,
) -> Result<impl Responder, AppError> {
    let customer_id = utils::parse_id(&path, "customer")?;
    let status = match query.status.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => Some(raw.parse::<LeadStatus>()?),
    };
    let request = PageRequest::parse(query.page.as_deref(), query.limit.as_deref());
    let page = leads::list_leads(&state, user.id(), customer_id, request, status).await?;
    Ok(HttpResponse::Ok().json(page))
}

#[post("/customers/{customer_id}/leads", wrap = "from_fn(auth::require_user)")]
pub async fn create_lead_handler(
    user: AuthUser,
    path: web::Path<String>,
    web::Json(form): web::Json<NewLead>,
    state: Data<AppState>,
) -> Result<impl Responder, AppError> {
    let customer_id = utils::parse_id(&path, "customer")?;
    form.validate()?;
    let lead = leads::create_lead(&state, user.id(), customer_id, form).await?;
    Ok(HttpResponse::Created().json(lead))
}

#[get("/customers/{customer_id}/leads/{lead_id}", wrap = "from_fn(auth::require_user)")]
pub async fn get_lead_handler(
    user: AuthUser,
    path: web::Path<(String, String)>,
    state: Data<AppState>,
) -> Result<impl Responder, AppError> {
    let (customer_id, lead_id) = path.into_inner();
    let customer_id = utils::parse_id(&customer_id, "customer")?;
    let lead_id = utils::parse_id(&lead_id, "lead")?;
    let lead = leads::get_lead(&state, user.id(), customer_id, lead_id).await?;
    Ok(HttpResponse::Ok().json(lead))
}

#[put("/customers/{customer_id}/leads/{lead_id}", wrap = "from_fn(auth::require_user)")]
pub async fn update_lead_handler(
    user: AuthUser,
    path: web::Path<(String, String)>,
    web::Json(form): web::Json<LeadChanges>,
    state: Data<AppState>,
) -> Result<impl Responder, AppError> {
    let (customer_id, lead_id) = path.into_inner();
    let customer_id = utils::parse_id(&customer_id, "customer")?;
    let lead_id = utils::parse_id(&lead_id, "lead")?;
    form.validate()?;
    let lead = leads::update_lead(&state, user.id(), customer_id, lead_id, form).await?;
    Ok(HttpResponse::Ok().json(lead))
}

#[delete("/customers/{customer_id}/leads/{lead_id}", wrap = "from_fn(auth::require_user)")]
pub async fn delete_lead_handler(
    user: AuthUser,
    path: web::Path<(String, String)>,
    state: Data<AppState>,
) -> Result<impl Responder, AppError> {
    let (customer_id, lead_id) = path.into_inner();
    let customer_id = utils::parse_id(&customer_id, "customer")?;
    let lead_id = utils::parse_id(&lead_id, "lead")?;
    leads::delete_lead(&state, user.id(), customer_id, lead_id).await?;
    Ok(HttpResponse::Ok().json(MessageResponse {
        message: "Lead deleted successfully".to_owned(),
    }))
}

// Reports

#[get("/reports/leads-by-status", wrap = "from_fn(auth::require_user)")]
pub async fn leads_by_status_handler(
    user: AuthUser,
    state: Data<AppState>,
) -> Result<impl Responder, AppError> {
    let report = reports::leads_by_status(&state, user.id()).await?;
    Ok(HttpResponse::Ok().json(report))
}
