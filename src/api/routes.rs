//! API route handlers

use axum::{
    extract::{Path, State},
    http::{HeaderMap, Method, Uri},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::Value;

use super::extract::{Validate, ValidJson};
use super::server::SharedState;
use crate::auth::{
    ensure_owner, validate_email, IdentityClaim, RequestContext, SessionResponse, SessionUser,
};
use crate::error::{Error, Result};
use crate::store::{
    Collection, DeleteResult, Document, DocumentId, DocumentStore, InsertResult, UpdateResult,
};

// Request/Response types

impl Validate for IdentityClaim {
    fn validate(&self) -> Result<()> {
        validate_email("email", &self.email)
    }
}

/// A query submitted by a user; any fields beyond `email` are stored as-is
#[derive(Debug, Deserialize)]
pub struct NewQuery {
    pub email: String,

    #[serde(flatten)]
    pub details: Document,
}

impl Validate for NewQuery {
    fn validate(&self) -> Result<()> {
        validate_email("email", &self.email)
    }
}

impl NewQuery {
    fn into_document(self) -> Document {
        let mut document = self.details;
        document.insert("email".to_string(), Value::String(self.email));
        document
    }
}

/// The fields `PUT /myQueries/{id}` overwrites. Other fields are ignored.
#[derive(Debug, Deserialize)]
pub struct QueryUpdate {
    pub name: String,
    pub brand: String,
    pub title: String,
    pub reason: String,
    pub image: String,
}

impl Validate for QueryUpdate {
    fn validate(&self) -> Result<()> {
        Ok(())
    }
}

impl QueryUpdate {
    fn into_document(self) -> Document {
        let mut document = Document::new();
        document.insert("name".to_string(), Value::String(self.name));
        document.insert("brand".to_string(), Value::String(self.brand));
        document.insert("title".to_string(), Value::String(self.title));
        document.insert("reason".to_string(), Value::String(self.reason));
        document.insert("image".to_string(), Value::String(self.image));
        document
    }
}

#[derive(Debug, Deserialize)]
pub struct NewRecommendation {
    #[serde(rename = "recommenderEmail")]
    pub recommender_email: String,

    #[serde(flatten)]
    pub details: Document,
}

impl Validate for NewRecommendation {
    fn validate(&self) -> Result<()> {
        validate_email("recommenderEmail", &self.recommender_email)
    }
}

impl NewRecommendation {
    fn into_document(self) -> Document {
        let mut document = self.details;
        document.insert(
            "recommenderEmail".to_string(),
            Value::String(self.recommender_email),
        );
        document
    }
}

// Ownership on writes

/// The caller a write must be attributed to, when writes are gated
fn writer(state: &SharedState, user: Option<IdentityClaim>) -> Result<Option<IdentityClaim>> {
    if !state.enforce_ownership_on_writes {
        return Ok(None);
    }
    user.map(Some).ok_or(Error::MissingToken)
}

/// Check `user` owns the stored document. Returns whether it exists.
async fn authorize_existing(
    store: &dyn DocumentStore,
    collection: Collection,
    id: DocumentId,
    user: &IdentityClaim,
) -> Result<bool> {
    match store.find_by_id(collection, id).await? {
        Some(document) => {
            let owner = document
                .get(collection.owner_field())
                .and_then(Value::as_str)
                .unwrap_or_default();
            ensure_owner(user, owner)?;
            Ok(true)
        }
        None => Ok(false),
    }
}

// Health check

pub async fn index() -> &'static str {
    "Alternative Stocks Is Running"
}

// Session routes

pub async fn login(
    State(state): State<SharedState>,
    ValidJson(claim): ValidJson<IdentityClaim>,
) -> Result<Response> {
    let token = state.gate.tokens().issue(&claim)?;
    let mut response = Json(SessionResponse::ok()).into_response();
    state.cookie.attach(&mut response, &token)?;

    tracing::info!(email = %claim.email, "Issued session token");
    Ok(response)
}

pub async fn logout(State(state): State<SharedState>) -> Response {
    let mut response = Json(SessionResponse::ok()).into_response();
    state.cookie.clear(&mut response);
    response
}

// Query routes

pub async fn list_queries(State(state): State<SharedState>) -> Result<Json<Vec<Document>>> {
    Ok(Json(state.store.find_all(Collection::Queries).await?))
}

pub async fn create_query(
    State(state): State<SharedState>,
    SessionUser(user): SessionUser,
    ValidJson(query): ValidJson<NewQuery>,
) -> Result<Json<InsertResult>> {
    if let Some(user) = writer(&state, user)? {
        ensure_owner(&user, &query.email)?;
    }

    let result = state
        .store
        .insert_one(Collection::Queries, query.into_document())
        .await?;
    Ok(Json(result))
}

/// `GET /myQueries/{key}`: a document id selects one query, anything else
/// is an owner email and needs that owner's session.
pub async fn get_my_queries(
    State(state): State<SharedState>,
    Path(key): Path<String>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Result<Response> {
    if let Ok(id) = key.parse::<DocumentId>() {
        let document = state.store.find_by_id(Collection::Queries, id).await?;
        return Ok(Json(document).into_response());
    }

    let user = state
        .gate
        .authenticate(RequestContext::from_parts(&method, &uri, &headers))?;
    ensure_owner(&user, &key)?;

    let documents = state
        .store
        .find_by_field(Collection::Queries, Collection::Queries.owner_field(), &key)
        .await?;
    Ok(Json(documents).into_response())
}

pub async fn update_query(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    SessionUser(user): SessionUser,
    ValidJson(update): ValidJson<QueryUpdate>,
) -> Result<Json<UpdateResult>> {
    let id: DocumentId = id.parse()?;
    let mut fields = update.into_document();

    if let Some(user) = writer(&state, user)? {
        let exists = authorize_existing(&*state.store, Collection::Queries, id, &user).await?;
        if !exists {
            // An upsert that creates the document makes the caller its owner
            fields.insert(
                Collection::Queries.owner_field().to_string(),
                Value::String(user.email),
            );
        }
    }

    let result = state
        .store
        .upsert_by_id(Collection::Queries, id, fields)
        .await?;
    Ok(Json(result))
}

pub async fn delete_query(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    SessionUser(user): SessionUser,
) -> Result<Json<DeleteResult>> {
    delete_document(&state, Collection::Queries, &id, user).await
}

// Recommendation routes

pub async fn list_recommendations(
    State(state): State<SharedState>,
) -> Result<Json<Vec<Document>>> {
    Ok(Json(state.store.find_all(Collection::Recommendations).await?))
}

pub async fn recommendations_by_email(
    State(state): State<SharedState>,
    Path(email): Path<String>,
) -> Result<Json<Vec<Document>>> {
    let documents = state
        .store
        .find_by_field(
            Collection::Recommendations,
            Collection::Recommendations.owner_field(),
            &email,
        )
        .await?;
    Ok(Json(documents))
}

pub async fn create_recommendation(
    State(state): State<SharedState>,
    SessionUser(user): SessionUser,
    ValidJson(recommendation): ValidJson<NewRecommendation>,
) -> Result<Json<InsertResult>> {
    if let Some(user) = writer(&state, user)? {
        ensure_owner(&user, &recommendation.recommender_email)?;
    }

    let result = state
        .store
        .insert_one(Collection::Recommendations, recommendation.into_document())
        .await?;
    Ok(Json(result))
}

pub async fn delete_recommendation(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    SessionUser(user): SessionUser,
) -> Result<Json<DeleteResult>> {
    delete_document(&state, Collection::Recommendations, &id, user).await
}

async fn delete_document(
    state: &SharedState,
    collection: Collection,
    id: &str,
    user: Option<IdentityClaim>,
) -> Result<Json<DeleteResult>> {
    let id: DocumentId = id.parse()?;
    if let Some(user) = writer(state, user)? {
        authorize_existing(&*state.store, collection, id, &user).await?;
    }

    Ok(Json(state.store.delete_by_id(collection, id).await?))
}
