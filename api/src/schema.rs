use std::sync::Arc;

use argon2::password_hash::{
    rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
};
use argon2::Argon2;
use async_graphql::{
    Context, EmptySubscription, Enum, Error, ErrorExtensions, InputObject, Object, Schema,
    SimpleObject, ID,
};
use chrono::{DateTime, Utc};
use entity::{activity_event, approver, document, external_signer, user, user_identity, user_role, user_secret};
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, Condition, DatabaseConnection, DbErr,
    EntityTrait, QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
};
use uuid::Uuid;

use crate::auth::{issue_token, AuthConfig, CurrentUser, UserRole, SESSION_COOKIE};
use crate::workflow::{
    self, ApproverDecision, NewSignerEntry, NewSubmission, SignerOutcome, WorkflowError,
};

pub struct AppSchema(pub Schema<QueryRoot, MutationRoot, EmptySubscription>);

pub fn build_schema(db: Arc<DatabaseConnection>, auth: Arc<AuthConfig>) -> AppSchema {
    let schema = Schema::build(QueryRoot, MutationRoot, EmptySubscription)
        .data(db)
        .data(auth)
        .finish();
    AppSchema(schema)
}

pub struct QueryRoot;
pub struct MutationRoot;

const MAX_DOCUMENTS_PAGE: i32 = 100;

#[Object]
impl QueryRoot {
    async fn workflow(&self) -> WorkflowQuery {
        WorkflowQuery
    }
}

#[Object]
impl MutationRoot {
    async fn workflow(&self) -> WorkflowMutation {
        WorkflowMutation
    }
}

#[derive(Default)]
pub struct WorkflowQuery;

#[derive(Default)]
pub struct WorkflowMutation;

#[Object]
impl WorkflowQuery {
    async fn me(&self, ctx: &Context<'_>) -> async_graphql::Result<MePayload> {
        let viewer = require_viewer(ctx)?;
        let db = database(ctx)?;
        let model = user::Entity::find_by_id(viewer.user_id)
            .one(db.as_ref())
            .await
            .map_err(db_error)?
            .ok_or_else(|| error_with_code("NOT_FOUND", "User not found"))?;
        Ok(MePayload {
            user: UserNode::from_model(model, viewer.roles.clone()),
            roles: viewer.roles.iter().map(|r| r.as_str().to_string()).collect(),
        })
    }

    async fn users(
        &self,
        ctx: &Context<'_>,
        first: Option<i32>,
        offset: Option<i32>,
        #[graphql(name = "privilegedOnly")] privileged_only: Option<bool>,
    ) -> async_graphql::Result<Vec<UserNode>> {
        require_viewer(ctx)?;
        let db = database(ctx)?;
        let limit = first.unwrap_or(50).clamp(1, 200) as u64;
        let skip = offset.unwrap_or(0).max(0) as u64;
        let records = user::Entity::find()
            .order_by_asc(user::Column::Email)
            .limit(limit)
            .offset(skip)
            .all(db.as_ref())
            .await
            .map_err(db_error)?;
        let role_rows = user_role::Entity::find()
            .filter(user_role::Column::UserId.is_in(records.iter().map(|u| u.id).collect::<Vec<_>>()))
            .all(db.as_ref())
            .await
            .map_err(db_error)?;
        let nodes: Vec<UserNode> = records
            .into_iter()
            .map(|model| {
                let roles = role_rows
                    .iter()
                    .filter(|row| row.user_id == model.id)
                    .filter_map(|row| UserRole::from_str(role_str(row.role)))
                    .collect::<Vec<_>>();
                UserNode::from_model(model, roles)
            })
            .filter(|node| {
                !privileged_only.unwrap_or(false)
                    || node
                        .roles
                        .iter()
                        .any(|r| r == "ADMIN" || r == "APPROVER")
            })
            .collect();
        Ok(nodes)
    }

    async fn document(
        &self,
        ctx: &Context<'_>,
        id: ID,
    ) -> async_graphql::Result<Option<DocumentViewPayload>> {
        require_viewer(ctx)?;
        let db = database(ctx)?;
        let document_id = parse_uuid(&id)?;
        match workflow::document_view(db.as_ref(), document_id).await {
            Ok(view) => Ok(Some(DocumentViewPayload::from(view))),
            Err(WorkflowError::NotFound(_)) => Ok(None),
            Err(err) => Err(workflow_error(err)),
        }
    }

    async fn documents(
        &self,
        ctx: &Context<'_>,
        first: Option<i32>,
        offset: Option<i32>,
        status: Option<DocumentStatus>,
        mine: Option<bool>,
    ) -> async_graphql::Result<Vec<DocumentNode>> {
        let viewer = require_viewer(ctx)?;
        let db = database(ctx)?;
        let requested = first.unwrap_or(25);
        if requested > MAX_DOCUMENTS_PAGE {
            return Err(error_with_code(
                "LIMIT_EXCEEDED",
                format!("first cannot exceed {}", MAX_DOCUMENTS_PAGE),
            ));
        }
        let limit = requested.clamp(1, MAX_DOCUMENTS_PAGE) as u64;
        let skip = offset.unwrap_or(0).max(0) as u64;
        let mut query = document::Entity::find();
        if let Some(status) = status {
            query = query.filter(document::Column::Status.eq(document::Status::from(status)));
        }
        if mine.unwrap_or(false) {
            query = query.filter(
                Condition::any().add(document::Column::CreatedBy.eq(viewer.user_id)),
            );
        }
        let rows = query
            .order_by_desc(document::Column::UpdatedAt)
            .limit(limit)
            .offset(skip)
            .all(db.as_ref())
            .await
            .map_err(db_error)?;
        Ok(rows.into_iter().map(DocumentNode::from).collect())
    }
}

#[Object]
impl WorkflowMutation {
    async fn login(
        &self,
        ctx: &Context<'_>,
        email: String,
        password: String,
    ) -> async_graphql::Result<AuthPayload> {
        let auth = auth_config(ctx)?;
        if !auth.local_auth_enabled {
            return Err(error_with_code("FORBIDDEN", "Local authentication is disabled"));
        }
        let db = database(ctx)?;
        let normalized = normalize_email(&email)?;
        let identity = user_identity::Entity::find()
            .filter(user_identity::Column::Provider.eq("local"))
            .filter(user_identity::Column::Subject.eq(normalized))
            .one(db.as_ref())
            .await
            .map_err(db_error)?;
        let Some(identity) = identity else {
            return Ok(AuthPayload::denied("Invalid credentials"));
        };
        let user = user::Entity::find_by_id(identity.user_id)
            .one(db.as_ref())
            .await
            .map_err(db_error)?;
        let Some(user) = user else {
            return Ok(AuthPayload::denied("Invalid credentials"));
        };
        if !user.is_active {
            return Ok(AuthPayload::denied("Account disabled"));
        }
        let secret = user_secret::Entity::find_by_id(user.id)
            .one(db.as_ref())
            .await
            .map_err(db_error)?;
        let Some(secret) = secret else {
            return Ok(AuthPayload::denied("Invalid credentials"));
        };
        let parsed_hash = PasswordHash::new(&secret.password_hash)
            .map_err(|_| error_with_code("INTERNAL", "Invalid password hash"))?;
        if Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_err()
        {
            return Ok(AuthPayload::denied("Invalid credentials"));
        }
        let roles = load_roles(db.as_ref(), user.id).await?;
        let token = issue_token(user.id, &roles, &auth)
            .map_err(|_| error_with_code("INTERNAL", "Failed to issue session token"))?;
        append_session_cookie(ctx, &token, auth.session_ttl_minutes);
        Ok(AuthPayload {
            ok: true,
            user: Some(UserNode::from_model(user, roles)),
            token: Some(token),
            error: None,
        })
    }

    async fn logout(&self, ctx: &Context<'_>) -> async_graphql::Result<bool> {
        append_session_cookie(ctx, "", -1);
        Ok(true)
    }

    async fn create_user(
        &self,
        ctx: &Context<'_>,
        input: NewUserInput,
    ) -> async_graphql::Result<UserNode> {
        require_role(ctx, UserRole::Admin)?;
        let db = database(ctx)?;
        let email = normalize_email(&input.email)?;
        let display_name = validate_display_name(&input.display_name)?;
        let roles = parse_roles(&input.roles)?;
        if roles.is_empty() {
            return Err(validation_error("roles must include at least one entry"));
        }
        let password_hash = hash_password(&input.password).map_err(db_error)?;
        // Single transaction: the new subject is fully provisioned (user,
        // identity, roles, secret) before anyone can observe it.
        let txn = db.begin().await.map_err(db_error)?;
        let now: DateTimeWithTimeZone = Utc::now().into();
        let user_id = Uuid::new_v4();
        user::ActiveModel {
            id: Set(user_id),
            email: Set(email.clone()),
            display_name: Set(display_name),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await
        .map_err(db_error)?;
        user_identity::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            provider: Set("local".into()),
            subject: Set(email),
            created_at: Set(now),
        }
        .insert(&txn)
        .await
        .map_err(db_error)?;
        user_secret::ActiveModel {
            user_id: Set(user_id),
            password_hash: Set(password_hash),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await
        .map_err(db_error)?;
        insert_roles(&txn, user_id, &roles).await?;
        txn.commit().await.map_err(db_error)?;
        let record = user::Entity::find_by_id(user_id)
            .one(db.as_ref())
            .await
            .map_err(db_error)?
            .ok_or_else(|| error_with_code("INTERNAL", "Failed to load new user"))?;
        Ok(UserNode::from_model(record, roles))
    }

    #[graphql(name = "submitDocument")]
    async fn submit_document(
        &self,
        ctx: &Context<'_>,
        input: SubmitDocumentInput,
    ) -> async_graphql::Result<DocumentNode> {
        let current = require_viewer(ctx)?;
        let db = database(ctx)?;
        let approver_ids = input
            .approver_ids
            .iter()
            .map(parse_uuid)
            .collect::<async_graphql::Result<Vec<_>>>()?;
        let submission = NewSubmission {
            title: input.title,
            description: input.description,
            file_url: input.file_url,
            submission_key: match input.submission_key {
                Some(key) => parse_uuid(&key)?,
                None => Uuid::new_v4(),
            },
            approver_ids,
            signers: input
                .signers
                .into_iter()
                .map(|s| NewSignerEntry {
                    name: s.name,
                    designation: s.designation,
                })
                .collect(),
        };
        let model = workflow::submit_document(db.as_ref(), submission, current.user_id)
            .await
            .map_err(workflow_error)?;
        Ok(model.into())
    }

    #[graphql(name = "recordApproverDecision")]
    async fn record_approver_decision(
        &self,
        ctx: &Context<'_>,
        input: ApproverDecisionInput,
    ) -> async_graphql::Result<DocumentNode> {
        let current = require_viewer(ctx)?;
        let db = database(ctx)?;
        let model = workflow::record_approver_decision(
            db.as_ref(),
            parse_uuid(&input.document_id)?,
            parse_uuid(&input.approver_id)?,
            &current,
            input.decision.into(),
            input.comments,
        )
        .await
        .map_err(workflow_error)?;
        Ok(model.into())
    }

    #[graphql(name = "recordSignerOutcome")]
    async fn record_signer_outcome(
        &self,
        ctx: &Context<'_>,
        input: SignerOutcomeInput,
    ) -> async_graphql::Result<DocumentNode> {
        let current = require_viewer(ctx)?;
        let db = database(ctx)?;
        let model = workflow::record_signer_outcome(
            db.as_ref(),
            parse_uuid(&input.document_id)?,
            parse_uuid(&input.signer_id)?,
            &current,
            input.outcome.into(),
            input.comments,
        )
        .await
        .map_err(workflow_error)?;
        Ok(model.into())
    }

    #[graphql(name = "deleteDocument")]
    async fn delete_document(&self, ctx: &Context<'_>, id: ID) -> async_graphql::Result<bool> {
        let current = require_viewer(ctx)?;
        let db = database(ctx)?;
        workflow::delete_document(db.as_ref(), parse_uuid(&id)?, &current)
            .await
            .map_err(workflow_error)
    }
}

#[derive(Enum, Copy, Clone, Eq, PartialEq, Debug)]
pub enum DocumentStatus {
    Draft,
    PendingApproval,
    Approved,
    Rejected,
    InProgress,
    Completed,
}

impl From<document::Status> for DocumentStatus {
    fn from(value: document::Status) -> Self {
        match value {
            document::Status::Draft => DocumentStatus::Draft,
            document::Status::PendingApproval => DocumentStatus::PendingApproval,
            document::Status::Approved => DocumentStatus::Approved,
            document::Status::Rejected => DocumentStatus::Rejected,
            document::Status::InProgress => DocumentStatus::InProgress,
            document::Status::Completed => DocumentStatus::Completed,
        }
    }
}

impl From<DocumentStatus> for document::Status {
    fn from(value: DocumentStatus) -> Self {
        match value {
            DocumentStatus::Draft => document::Status::Draft,
            DocumentStatus::PendingApproval => document::Status::PendingApproval,
            DocumentStatus::Approved => document::Status::Approved,
            DocumentStatus::Rejected => document::Status::Rejected,
            DocumentStatus::InProgress => document::Status::InProgress,
            DocumentStatus::Completed => document::Status::Completed,
        }
    }
}

#[derive(Enum, Copy, Clone, Eq, PartialEq, Debug)]
pub enum ApproverStatus {
    Pending,
    Approved,
    Rejected,
}

impl From<approver::Status> for ApproverStatus {
    fn from(value: approver::Status) -> Self {
        match value {
            approver::Status::Pending => ApproverStatus::Pending,
            approver::Status::Approved => ApproverStatus::Approved,
            approver::Status::Rejected => ApproverStatus::Rejected,
        }
    }
}

#[derive(Enum, Copy, Clone, Eq, PartialEq, Debug)]
pub enum SignerStatus {
    Pending,
    Signed,
    Rejected,
}

impl From<external_signer::Status> for SignerStatus {
    fn from(value: external_signer::Status) -> Self {
        match value {
            external_signer::Status::Pending => SignerStatus::Pending,
            external_signer::Status::Signed => SignerStatus::Signed,
            external_signer::Status::Rejected => SignerStatus::Rejected,
        }
    }
}

#[derive(Enum, Copy, Clone, Eq, PartialEq, Debug)]
pub enum Decision {
    Approved,
    Rejected,
}

impl From<Decision> for ApproverDecision {
    fn from(value: Decision) -> Self {
        match value {
            Decision::Approved => ApproverDecision::Approved,
            Decision::Rejected => ApproverDecision::Rejected,
        }
    }
}

#[derive(Enum, Copy, Clone, Eq, PartialEq, Debug)]
pub enum Outcome {
    Signed,
    Rejected,
}

impl From<Outcome> for SignerOutcome {
    fn from(value: Outcome) -> Self {
        match value {
            Outcome::Signed => SignerOutcome::Signed,
            Outcome::Rejected => SignerOutcome::Rejected,
        }
    }
}

#[derive(InputObject, Clone)]
pub struct SignerEntryInput {
    pub name: String,
    pub designation: String,
}

#[derive(InputObject, Clone)]
pub struct SubmitDocumentInput {
    pub title: String,
    pub description: Option<String>,
    #[graphql(name = "fileUrl")]
    pub file_url: String,
    #[graphql(name = "submissionKey")]
    pub submission_key: Option<ID>,
    #[graphql(name = "approverIds")]
    pub approver_ids: Vec<ID>,
    pub signers: Vec<SignerEntryInput>,
}

#[derive(InputObject, Clone)]
pub struct ApproverDecisionInput {
    #[graphql(name = "documentId")]
    pub document_id: ID,
    #[graphql(name = "approverId")]
    pub approver_id: ID,
    pub decision: Decision,
    pub comments: Option<String>,
}

#[derive(InputObject, Clone)]
pub struct SignerOutcomeInput {
    #[graphql(name = "documentId")]
    pub document_id: ID,
    #[graphql(name = "signerId")]
    pub signer_id: ID,
    pub outcome: Outcome,
    pub comments: Option<String>,
}

#[derive(Clone, Debug, InputObject)]
pub struct NewUserInput {
    pub email: String,
    #[graphql(name = "displayName")]
    pub display_name: String,
    pub password: String,
    pub roles: Vec<String>,
}

#[derive(Clone, Debug, SimpleObject)]
#[graphql(name = "Document")]
pub struct DocumentNode {
    pub id: ID,
    pub title: String,
    pub description: Option<String>,
    #[graphql(name = "fileUrl")]
    pub file_url: String,
    pub status: DocumentStatus,
    #[graphql(name = "createdBy")]
    pub created_by: ID,
    #[graphql(name = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[graphql(name = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl From<document::Model> for DocumentNode {
    fn from(model: document::Model) -> Self {
        Self {
            id: ID::from(model.id.to_string()),
            title: model.title,
            description: model.description,
            file_url: model.file_url,
            status: model.status.into(),
            created_by: ID::from(model.created_by.to_string()),
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        }
    }
}

#[derive(Clone, Debug, SimpleObject)]
#[graphql(name = "Approver")]
pub struct ApproverNode {
    pub id: ID,
    #[graphql(name = "documentId")]
    pub document_id: ID,
    #[graphql(name = "userId")]
    pub user_id: ID,
    pub position: i32,
    pub status: ApproverStatus,
    pub comments: Option<String>,
    #[graphql(name = "decidedAt")]
    pub decided_at: Option<DateTime<Utc>>,
}

impl From<approver::Model> for ApproverNode {
    fn from(model: approver::Model) -> Self {
        Self {
            id: ID::from(model.id.to_string()),
            document_id: ID::from(model.document_id.to_string()),
            user_id: ID::from(model.user_id.to_string()),
            position: model.position,
            status: model.status.into(),
            comments: model.comments,
            decided_at: model.decided_at.map(|d| d.into()),
        }
    }
}

#[derive(Clone, Debug, SimpleObject)]
#[graphql(name = "ExternalSigner")]
pub struct ExternalSignerNode {
    pub id: ID,
    #[graphql(name = "documentId")]
    pub document_id: ID,
    pub name: String,
    pub designation: String,
    pub position: i32,
    pub status: SignerStatus,
    pub comments: Option<String>,
    #[graphql(name = "signedAt")]
    pub signed_at: Option<DateTime<Utc>>,
}

impl From<external_signer::Model> for ExternalSignerNode {
    fn from(model: external_signer::Model) -> Self {
        Self {
            id: ID::from(model.id.to_string()),
            document_id: ID::from(model.document_id.to_string()),
            name: model.name,
            designation: model.designation,
            position: model.position,
            status: model.status.into(),
            comments: model.comments,
            signed_at: model.signed_at.map(|d| d.into()),
        }
    }
}

#[derive(Clone, Debug, SimpleObject)]
#[graphql(name = "ActivityEvent")]
pub struct ActivityEventNode {
    pub id: ID,
    #[graphql(name = "documentId")]
    pub document_id: ID,
    #[graphql(name = "actorId")]
    pub actor_id: Option<ID>,
    pub kind: String,
    pub message: String,
    #[graphql(name = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl From<activity_event::Model> for ActivityEventNode {
    fn from(model: activity_event::Model) -> Self {
        Self {
            id: ID::from(model.id.to_string()),
            document_id: ID::from(model.document_id.to_string()),
            actor_id: model.actor_id.map(|id| ID::from(id.to_string())),
            kind: event_kind_str(model.kind).to_string(),
            message: model.message,
            created_at: model.created_at.into(),
        }
    }
}

fn event_kind_str(kind: activity_event::Kind) -> &'static str {
    match kind {
        activity_event::Kind::Created => "created",
        activity_event::Kind::Approved => "approved",
        activity_event::Kind::Rejected => "rejected",
        activity_event::Kind::SigningStarted => "signing_started",
        activity_event::Kind::SignatureReceived => "signature_received",
        activity_event::Kind::Completed => "completed",
        activity_event::Kind::GeneralUpdate => "general_update",
    }
}

#[derive(Clone, Debug, SimpleObject)]
#[graphql(name = "DocumentView")]
pub struct DocumentViewPayload {
    pub document: DocumentNode,
    pub approvers: Vec<ApproverNode>,
    pub signers: Vec<ExternalSignerNode>,
    pub events: Vec<ActivityEventNode>,
}

impl From<workflow::DocumentView> for DocumentViewPayload {
    fn from(view: workflow::DocumentView) -> Self {
        Self {
            document: view.document.into(),
            approvers: view.approvers.into_iter().map(ApproverNode::from).collect(),
            signers: view
                .signers
                .into_iter()
                .map(ExternalSignerNode::from)
                .collect(),
            events: view
                .events
                .into_iter()
                .map(ActivityEventNode::from)
                .collect(),
        }
    }
}

#[derive(Clone, Debug, SimpleObject)]
#[graphql(name = "User")]
pub struct UserNode {
    pub id: ID,
    pub email: String,
    #[graphql(name = "displayName")]
    pub display_name: String,
    #[graphql(name = "isActive")]
    pub is_active: bool,
    pub roles: Vec<String>,
    #[graphql(name = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl UserNode {
    fn from_model(model: user::Model, roles: Vec<UserRole>) -> Self {
        Self {
            id: ID::from(model.id.to_string()),
            email: model.email,
            display_name: model.display_name,
            is_active: model.is_active,
            roles: roles.into_iter().map(|r| r.as_str().to_string()).collect(),
            created_at: model.created_at.into(),
        }
    }
}

#[derive(Clone, Debug, SimpleObject)]
pub struct MePayload {
    pub user: UserNode,
    pub roles: Vec<String>,
}

#[derive(Clone, Debug, SimpleObject, Default)]
pub struct AuthPayload {
    pub ok: bool,
    pub user: Option<UserNode>,
    pub token: Option<String>,
    pub error: Option<String>,
}

impl AuthPayload {
    fn denied(message: &str) -> Self {
        Self {
            ok: false,
            user: None,
            token: None,
            error: Some(message.into()),
        }
    }
}

fn database(ctx: &Context<'_>) -> async_graphql::Result<Arc<DatabaseConnection>> {
    ctx.data::<Arc<DatabaseConnection>>()
        .cloned()
        .map_err(|_| error_with_code("INTERNAL", "Missing database connection"))
}

fn auth_config(ctx: &Context<'_>) -> async_graphql::Result<Arc<AuthConfig>> {
    ctx.data::<Arc<AuthConfig>>()
        .cloned()
        .map_err(|_| error_with_code("INTERNAL", "Missing auth configuration"))
}

fn current_user(ctx: &Context<'_>) -> async_graphql::Result<CurrentUser> {
    ctx.data::<CurrentUser>()
        .cloned()
        .map_err(|_| error_with_code("UNAUTHENTICATED", "Login required"))
}

fn require_role(ctx: &Context<'_>, role: UserRole) -> async_graphql::Result<CurrentUser> {
    let user = current_user(ctx)?;
    if user.has_role(role) {
        Ok(user)
    } else {
        Err(error_with_code("FORBIDDEN", "Insufficient permissions"))
    }
}

fn require_viewer(ctx: &Context<'_>) -> async_graphql::Result<CurrentUser> {
    require_role(ctx, UserRole::Member)
}

fn parse_uuid(id: &ID) -> async_graphql::Result<Uuid> {
    Uuid::parse_str(id.as_str()).map_err(|_| error_with_code("BAD_REQUEST", "Invalid ID"))
}

fn db_error(err: DbErr) -> Error {
    error_with_code("INTERNAL", format!("Database error: {}", err))
}

fn validation_error(message: impl Into<String>) -> Error {
    error_with_code("VALIDATION", message)
}

fn workflow_error(err: WorkflowError) -> Error {
    match err {
        WorkflowError::Validation(msg) => error_with_code("VALIDATION", msg),
        WorkflowError::Forbidden(msg) => error_with_code("FORBIDDEN", msg),
        WorkflowError::NotFound(what) => {
            error_with_code("NOT_FOUND", format!("{} not found", what))
        }
        WorkflowError::Conflict(msg) => error_with_code("CONFLICT", msg),
        WorkflowError::Db(e) => db_error(e),
    }
}

fn error_with_code(code: &'static str, message: impl Into<String>) -> Error {
    Error::new(message).extend_with(|_, e| e.set("code", code))
}

fn append_session_cookie(ctx: &Context<'_>, token: &str, ttl_minutes: i64) {
    let cookie = if ttl_minutes < 0 {
        format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", SESSION_COOKIE)
    } else {
        format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
            SESSION_COOKIE,
            token,
            ttl_minutes * 60
        )
    };
    ctx.append_http_header("Set-Cookie", cookie);
}

fn normalize_email(email: &str) -> async_graphql::Result<String> {
    let trimmed = email.trim().to_lowercase();
    if trimmed.is_empty() || !trimmed.contains('@') {
        return Err(validation_error("A valid email address is required"));
    }
    Ok(trimmed)
}

fn validate_display_name(name: &str) -> async_graphql::Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(validation_error("Display name cannot be empty"));
    }
    Ok(trimmed.to_string())
}

fn parse_roles(values: &[String]) -> async_graphql::Result<Vec<UserRole>> {
    let mut roles = Vec::new();
    for value in values {
        let role = UserRole::from_str(value)
            .ok_or_else(|| validation_error(format!("Unknown role: {}", value)))?;
        if !roles.contains(&role) {
            roles.push(role);
        }
    }
    Ok(roles)
}

fn role_str(role: user_role::Role) -> &'static str {
    match role {
        user_role::Role::Admin => "ADMIN",
        user_role::Role::Approver => "APPROVER",
        user_role::Role::Member => "MEMBER",
    }
}

fn entity_role(role: UserRole) -> user_role::Role {
    match role {
        UserRole::Admin => user_role::Role::Admin,
        UserRole::Approver => user_role::Role::Approver,
        UserRole::Member => user_role::Role::Member,
    }
}

async fn load_roles(db: &DatabaseConnection, user_id: Uuid) -> async_graphql::Result<Vec<UserRole>> {
    let rows = user_role::Entity::find()
        .filter(user_role::Column::UserId.eq(user_id))
        .all(db)
        .await
        .map_err(db_error)?;
    Ok(rows
        .into_iter()
        .filter_map(|row| UserRole::from_str(role_str(row.role)))
        .collect())
}

async fn insert_roles(
    txn: &sea_orm::DatabaseTransaction,
    user_id: Uuid,
    roles: &[UserRole],
) -> async_graphql::Result<()> {
    for role in roles {
        user_role::ActiveModel {
            user_id: Set(user_id),
            role: Set(entity_role(*role)),
        }
        .insert(txn)
        .await
        .map_err(db_error)?;
    }
    Ok(())
}

fn hash_password(password: &str) -> Result<String, DbErr> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| DbErr::Custom(format!("hash error: {}", err)))
}

#[derive(Debug, Clone)]
pub struct SeededWorkflowRecords {
    pub users: Vec<user::Model>,
    pub documents: Vec<document::Model>,
}

impl SeededWorkflowRecords {
    pub fn user_email(&self, email: &str) -> Option<&user::Model> {
        self.users.iter().find(|u| u.email == email)
    }

    pub fn document_titled(&self, title: &str) -> Option<&document::Model> {
        self.documents.iter().find(|d| d.title == title)
    }
}

/// Demo fixture: a handful of club members and one document already in the
/// approval stage, driven through the real submission path.
pub async fn seed_workflow_demo(
    db: &DatabaseConnection,
) -> Result<SeededWorkflowRecords, DbErr> {
    let chair = insert_seed_user(
        db,
        "chair@club.test",
        "Casey Chair",
        &[user_role::Role::Admin, user_role::Role::Approver],
        "chairpass",
    )
    .await?;
    let treasurer = insert_seed_user(
        db,
        "treasurer@club.test",
        "Terry Treasurer",
        &[user_role::Role::Approver],
        "treasurerpass",
    )
    .await?;
    let secretary = insert_seed_user(
        db,
        "secretary@club.test",
        "Sasha Secretary",
        &[user_role::Role::Approver],
        "secretarypass",
    )
    .await?;
    let member = insert_seed_user(
        db,
        "member@club.test",
        "Morgan Member",
        &[user_role::Role::Member],
        "memberpass",
    )
    .await?;

    let submission = NewSubmission {
        title: "Annual Budget 2026".into(),
        description: Some("Budget proposal for the coming club year.".into()),
        file_url: "http://localhost:8080/files/seed-annual-budget.pdf".into(),
        submission_key: Uuid::new_v4(),
        approver_ids: vec![treasurer.id, secretary.id],
        signers: vec![NewSignerEntry {
            name: "Dana Auditor".into(),
            designation: "External Auditor".into(),
        }],
    };
    let budget = workflow::submit_document(db, submission, member.id)
        .await
        .map_err(|err| DbErr::Custom(format!("seed submission failed: {}", err)))?;

    Ok(SeededWorkflowRecords {
        users: vec![chair, treasurer, secretary, member],
        documents: vec![budget],
    })
}

async fn insert_seed_user(
    db: &DatabaseConnection,
    email: &str,
    display_name: &str,
    roles: &[user_role::Role],
    password: &str,
) -> Result<user::Model, DbErr> {
    let now: DateTimeWithTimeZone = Utc::now().into();
    let model = user::ActiveModel {
        id: Set(Uuid::new_v4()),
        email: Set(email.to_string()),
        display_name: Set(display_name.to_string()),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await?;
    user_identity::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(model.id),
        provider: Set("local".into()),
        subject: Set(email.to_string()),
        created_at: Set(now),
    }
    .insert(db)
    .await?;
    user_secret::ActiveModel {
        user_id: Set(model.id),
        password_hash: Set(hash_password(password)?),
        updated_at: Set(now),
    }
    .insert(db)
    .await?;
    for role in roles {
        user_role::ActiveModel {
            user_id: Set(model.id),
            role: Set(*role),
        }
        .insert(db)
        .await?;
    }
    Ok(model)
}
