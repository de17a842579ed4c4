use chrono::Utc;
use entity::{activity_event, approver, document, external_signer, user, user_role};
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, DatabaseTransaction,
    DbErr, EntityTrait, QueryFilter, QueryOrder, TransactionTrait,
};
use std::collections::HashSet;
use thiserror::Error;
use tracing::{info_span, Instrument};
use uuid::Uuid;

use crate::auth::CurrentUser;

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    Conflict(String),
    #[error("database error: {0}")]
    Db(#[from] DbErr),
}

pub type WorkflowResult<T> = Result<T, WorkflowError>;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ApproverDecision {
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum SignerOutcome {
    Signed,
    Rejected,
}

#[derive(Debug, Clone)]
pub struct NewSignerEntry {
    pub name: String,
    pub designation: String,
}

#[derive(Debug, Clone)]
pub struct NewSubmission {
    pub title: String,
    pub description: Option<String>,
    pub file_url: String,
    /// Caller-supplied idempotency key. Re-submitting with the same key
    /// returns the document created by the first attempt.
    pub submission_key: Uuid,
    pub approver_ids: Vec<Uuid>,
    pub signers: Vec<NewSignerEntry>,
}

/// Read-only projection of a document together with its children.
#[derive(Debug, Clone)]
pub struct DocumentView {
    pub document: document::Model,
    pub approvers: Vec<approver::Model>,
    pub signers: Vec<external_signer::Model>,
    pub events: Vec<activity_event::Model>,
}

/// The one status rule. Both mutation paths call this against a fresh read
/// of the full child set, so the document status can never disagree with a
/// re-scan of its children.
pub fn derive_status(
    approvers: &[approver::Status],
    signers: &[external_signer::Status],
) -> document::Status {
    let approver_rejected = approvers.iter().any(|s| *s == approver::Status::Rejected);
    let signer_rejected = signers.iter().any(|s| *s == external_signer::Status::Rejected);
    if approver_rejected || signer_rejected {
        return document::Status::Rejected;
    }
    let all_approved = approvers.iter().all(|s| *s == approver::Status::Approved);
    if !all_approved {
        return document::Status::PendingApproval;
    }
    let all_signed = signers.iter().all(|s| *s == external_signer::Status::Signed);
    if all_signed {
        document::Status::Completed
    } else {
        document::Status::InProgress
    }
}

pub async fn submit_document(
    db: &DatabaseConnection,
    input: NewSubmission,
    submitted_by: Uuid,
) -> WorkflowResult<document::Model> {
    let span = info_span!(
        "workflow.submit",
        approvers = input.approver_ids.len(),
        signers = input.signers.len()
    );
    submit_internal(db, input, submitted_by).instrument(span).await
}

async fn submit_internal(
    db: &DatabaseConnection,
    input: NewSubmission,
    submitted_by: Uuid,
) -> WorkflowResult<document::Model> {
    let title = input.title.trim().to_string();
    if title.is_empty() {
        return Err(WorkflowError::Validation("title cannot be empty".into()));
    }
    if input.approver_ids.is_empty() {
        return Err(WorkflowError::Validation(
            "at least one approver is required".into(),
        ));
    }
    if input.signers.is_empty() {
        return Err(WorkflowError::Validation(
            "at least one external signer is required".into(),
        ));
    }
    let distinct: HashSet<Uuid> = input.approver_ids.iter().copied().collect();
    if distinct.len() != input.approver_ids.len() {
        return Err(WorkflowError::Validation(
            "approver list contains duplicates".into(),
        ));
    }
    for signer in &input.signers {
        if signer.name.trim().is_empty() {
            return Err(WorkflowError::Validation(
                "signer name cannot be empty".into(),
            ));
        }
    }

    // Idempotent retry: the first successful submission with this key wins.
    if let Some(existing) = document::Entity::find()
        .filter(document::Column::SubmissionKey.eq(input.submission_key))
        .one(db)
        .await?
    {
        return Ok(existing);
    }

    ensure_privileged_approvers(db, &input.approver_ids).await?;

    let now: DateTimeWithTimeZone = Utc::now().into();
    let document_id = Uuid::new_v4();
    let txn = db.begin().await?;

    document::ActiveModel {
        id: Set(document_id),
        title: Set(title.clone()),
        description: Set(input.description.clone()),
        file_url: Set(input.file_url.clone()),
        submission_key: Set(input.submission_key),
        status: Set(document::Status::PendingApproval),
        created_by: Set(submitted_by),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&txn)
    .await?;

    let approver_rows: Vec<approver::ActiveModel> = input
        .approver_ids
        .iter()
        .enumerate()
        .map(|(idx, user_id)| approver::ActiveModel {
            id: Set(Uuid::new_v4()),
            document_id: Set(document_id),
            user_id: Set(*user_id),
            position: Set(idx as i32),
            status: Set(approver::Status::Pending),
            comments: Set(None),
            decided_at: Set(None),
        })
        .collect();
    approver::Entity::insert_many(approver_rows)
        .exec_without_returning(&txn)
        .await?;

    let signer_rows: Vec<external_signer::ActiveModel> = input
        .signers
        .iter()
        .enumerate()
        .map(|(idx, signer)| external_signer::ActiveModel {
            id: Set(Uuid::new_v4()),
            document_id: Set(document_id),
            name: Set(signer.name.trim().to_string()),
            designation: Set(signer.designation.trim().to_string()),
            position: Set(idx as i32),
            status: Set(external_signer::Status::Pending),
            comments: Set(None),
            signed_at: Set(None),
        })
        .collect();
    external_signer::Entity::insert_many(signer_rows)
        .exec_without_returning(&txn)
        .await?;

    append_event(
        &txn,
        document_id,
        Some(submitted_by),
        activity_event::Kind::Created,
        format!("Document \"{}\" submitted for approval", title),
        now,
    )
    .await?;

    txn.commit().await?;

    document::Entity::find_by_id(document_id)
        .one(db)
        .await?
        .ok_or(WorkflowError::NotFound("document"))
}

pub async fn record_approver_decision(
    db: &DatabaseConnection,
    document_id: Uuid,
    approver_id: Uuid,
    current: &CurrentUser,
    decision: ApproverDecision,
    comments: Option<String>,
) -> WorkflowResult<document::Model> {
    let span = info_span!(
        "workflow.decision",
        %document_id,
        approved = (decision == ApproverDecision::Approved)
    );
    decision_internal(db, document_id, approver_id, current, decision, comments)
        .instrument(span)
        .await
}

async fn decision_internal(
    db: &DatabaseConnection,
    document_id: Uuid,
    approver_id: Uuid,
    current: &CurrentUser,
    decision: ApproverDecision,
    comments: Option<String>,
) -> WorkflowResult<document::Model> {
    let txn = db.begin().await?;
    let doc = document::Entity::find_by_id(document_id)
        .one(&txn)
        .await?
        .ok_or(WorkflowError::NotFound("document"))?;
    if doc.status != document::Status::PendingApproval {
        return Err(WorkflowError::Forbidden(
            "document is not awaiting approval".into(),
        ));
    }

    let row = approver::Entity::find_by_id(approver_id)
        .one(&txn)
        .await?
        .filter(|row| row.document_id == document_id)
        .ok_or(WorkflowError::NotFound("approver assignment"))?;
    if row.user_id != current.user_id {
        return Err(WorkflowError::Forbidden(
            "only the assigned approver may act on this assignment".into(),
        ));
    }
    if row.status != approver::Status::Pending {
        return Err(WorkflowError::Conflict(
            "a decision has already been recorded for this assignment".into(),
        ));
    }

    let now: DateTimeWithTimeZone = Utc::now().into();
    let next_row_status = match decision {
        ApproverDecision::Approved => approver::Status::Approved,
        ApproverDecision::Rejected => approver::Status::Rejected,
    };
    let mut active: approver::ActiveModel = row.into();
    active.status = Set(next_row_status);
    active.comments = Set(comments.clone());
    active.decided_at = Set(Some(now));
    active.update(&txn).await?;

    let next = derive_from_children(&txn, document_id).await?;
    apply_status(&txn, document_id, document::Status::PendingApproval, next, now).await?;

    let actor_name = display_name(&txn, current.user_id).await?;
    let (kind, fallback) = match decision {
        ApproverDecision::Approved => (
            activity_event::Kind::Approved,
            format!("{} approved the document", actor_name),
        ),
        ApproverDecision::Rejected => (
            activity_event::Kind::Rejected,
            format!("{} rejected the document", actor_name),
        ),
    };
    append_event(
        &txn,
        document_id,
        Some(current.user_id),
        kind,
        comments.unwrap_or(fallback),
        now,
    )
    .await?;

    if next == document::Status::InProgress {
        append_event(
            &txn,
            document_id,
            Some(current.user_id),
            activity_event::Kind::SigningStarted,
            "All approvals received; external signing started".into(),
            now,
        )
        .await?;
    }

    txn.commit().await?;
    Ok(document::Model {
        status: next,
        updated_at: now,
        ..doc
    })
}

pub async fn record_signer_outcome(
    db: &DatabaseConnection,
    document_id: Uuid,
    signer_id: Uuid,
    current: &CurrentUser,
    outcome: SignerOutcome,
    comments: Option<String>,
) -> WorkflowResult<document::Model> {
    let span = info_span!(
        "workflow.signature",
        %document_id,
        signed = (outcome == SignerOutcome::Signed)
    );
    signature_internal(db, document_id, signer_id, current, outcome, comments)
        .instrument(span)
        .await
}

async fn signature_internal(
    db: &DatabaseConnection,
    document_id: Uuid,
    signer_id: Uuid,
    current: &CurrentUser,
    outcome: SignerOutcome,
    comments: Option<String>,
) -> WorkflowResult<document::Model> {
    let txn = db.begin().await?;
    let doc = document::Entity::find_by_id(document_id)
        .one(&txn)
        .await?
        .ok_or(WorkflowError::NotFound("document"))?;
    if doc.status != document::Status::InProgress {
        return Err(WorkflowError::Forbidden(
            "document is not in the signing stage".into(),
        ));
    }
    if doc.created_by != current.user_id && !current.is_privileged() {
        return Err(WorkflowError::Forbidden(
            "only the document creator or a privileged user may record signature outcomes".into(),
        ));
    }

    let row = external_signer::Entity::find_by_id(signer_id)
        .one(&txn)
        .await?
        .filter(|row| row.document_id == document_id)
        .ok_or(WorkflowError::NotFound("external signer"))?;
    if row.status != external_signer::Status::Pending {
        return Err(WorkflowError::Conflict(
            "an outcome has already been recorded for this signer".into(),
        ));
    }

    let now: DateTimeWithTimeZone = Utc::now().into();
    let signer_name = row.name.clone();
    let next_row_status = match outcome {
        SignerOutcome::Signed => external_signer::Status::Signed,
        SignerOutcome::Rejected => external_signer::Status::Rejected,
    };
    let mut active: external_signer::ActiveModel = row.into();
    active.status = Set(next_row_status);
    active.comments = Set(comments.clone());
    active.signed_at = Set(match outcome {
        SignerOutcome::Signed => Some(now),
        SignerOutcome::Rejected => None,
    });
    active.update(&txn).await?;

    let next = derive_from_children(&txn, document_id).await?;
    apply_status(&txn, document_id, document::Status::InProgress, next, now).await?;

    let (kind, fallback) = match outcome {
        SignerOutcome::Signed => (
            activity_event::Kind::SignatureReceived,
            format!("Signature received from {}", signer_name),
        ),
        SignerOutcome::Rejected => (
            activity_event::Kind::Rejected,
            format!("{} declined to sign", signer_name),
        ),
    };
    append_event(
        &txn,
        document_id,
        Some(current.user_id),
        kind,
        comments.unwrap_or(fallback),
        now,
    )
    .await?;

    if next == document::Status::Completed {
        append_event(
            &txn,
            document_id,
            Some(current.user_id),
            activity_event::Kind::Completed,
            "All signatures received; document completed".into(),
            now,
        )
        .await?;
    }

    txn.commit().await?;
    Ok(document::Model {
        status: next,
        updated_at: now,
        ..doc
    })
}

pub async fn document_view(
    db: &DatabaseConnection,
    document_id: Uuid,
) -> WorkflowResult<DocumentView> {
    let document = document::Entity::find_by_id(document_id)
        .one(db)
        .await?
        .ok_or(WorkflowError::NotFound("document"))?;
    let approvers = approver::Entity::find()
        .filter(approver::Column::DocumentId.eq(document_id))
        .order_by_asc(approver::Column::Position)
        .all(db)
        .await?;
    let signers = external_signer::Entity::find()
        .filter(external_signer::Column::DocumentId.eq(document_id))
        .order_by_asc(external_signer::Column::Position)
        .all(db)
        .await?;
    let events = activity_event::Entity::find()
        .filter(activity_event::Column::DocumentId.eq(document_id))
        .order_by_desc(activity_event::Column::CreatedAt)
        .all(db)
        .await?;
    Ok(DocumentView {
        document,
        approvers,
        signers,
        events,
    })
}

pub async fn delete_document(
    db: &DatabaseConnection,
    document_id: Uuid,
    current: &CurrentUser,
) -> WorkflowResult<bool> {
    let doc = document::Entity::find_by_id(document_id)
        .one(db)
        .await?
        .ok_or(WorkflowError::NotFound("document"))?;
    if doc.created_by != current.user_id && !current.has_role(crate::auth::UserRole::Admin) {
        return Err(WorkflowError::Forbidden(
            "only the document creator or an admin may delete a document".into(),
        ));
    }
    let res = document::Entity::delete_by_id(document_id).exec(db).await?;
    Ok(res.rows_affected > 0)
}

/// Every approver must be an existing, active user holding the approver
/// role or better.
async fn ensure_privileged_approvers(
    db: &DatabaseConnection,
    approver_ids: &[Uuid],
) -> WorkflowResult<()> {
    let users = user::Entity::find()
        .filter(user::Column::Id.is_in(approver_ids.to_vec()))
        .all(db)
        .await?;
    if users.len() != approver_ids.len() {
        return Err(WorkflowError::NotFound("approver user"));
    }
    if let Some(inactive) = users.iter().find(|u| !u.is_active) {
        return Err(WorkflowError::Validation(format!(
            "user {} is not active",
            inactive.email
        )));
    }
    let roles = user_role::Entity::find()
        .filter(user_role::Column::UserId.is_in(approver_ids.to_vec()))
        .all(db)
        .await?;
    for user in &users {
        let privileged = roles.iter().any(|row| {
            row.user_id == user.id
                && matches!(row.role, user_role::Role::Admin | user_role::Role::Approver)
        });
        if !privileged {
            return Err(WorkflowError::Validation(format!(
                "user {} cannot approve documents",
                user.email
            )));
        }
    }
    Ok(())
}

async fn derive_from_children(
    txn: &DatabaseTransaction,
    document_id: Uuid,
) -> WorkflowResult<document::Status> {
    let approver_statuses: Vec<approver::Status> = approver::Entity::find()
        .filter(approver::Column::DocumentId.eq(document_id))
        .all(txn)
        .await?
        .into_iter()
        .map(|row| row.status)
        .collect();
    let signer_statuses: Vec<external_signer::Status> = external_signer::Entity::find()
        .filter(external_signer::Column::DocumentId.eq(document_id))
        .all(txn)
        .await?
        .into_iter()
        .map(|row| row.status)
        .collect();
    Ok(derive_status(&approver_statuses, &signer_statuses))
}

/// Compare-and-set on the previously observed status. A concurrent writer
/// that already advanced the document makes this a zero-row update, which
/// surfaces as a conflict instead of silently overwriting.
async fn apply_status(
    txn: &DatabaseTransaction,
    document_id: Uuid,
    expected: document::Status,
    next: document::Status,
    now: DateTimeWithTimeZone,
) -> WorkflowResult<()> {
    let res = document::Entity::update_many()
        .col_expr(document::Column::Status, Expr::value(next))
        .col_expr(document::Column::UpdatedAt, Expr::value(now))
        .filter(document::Column::Id.eq(document_id))
        .filter(document::Column::Status.eq(expected))
        .exec(txn)
        .await?;
    if res.rows_affected == 0 {
        return Err(WorkflowError::Conflict(
            "document status changed concurrently; re-fetch and retry".into(),
        ));
    }
    Ok(())
}

async fn append_event(
    txn: &DatabaseTransaction,
    document_id: Uuid,
    actor_id: Option<Uuid>,
    kind: activity_event::Kind,
    message: String,
    now: DateTimeWithTimeZone,
) -> WorkflowResult<()> {
    activity_event::ActiveModel {
        id: Set(Uuid::new_v4()),
        document_id: Set(document_id),
        actor_id: Set(actor_id),
        kind: Set(kind),
        message: Set(message),
        created_at: Set(now),
    }
    .insert(txn)
    .await?;
    Ok(())
}

async fn display_name(txn: &DatabaseTransaction, user_id: Uuid) -> WorkflowResult<String> {
    Ok(user::Entity::find_by_id(user_id)
        .one(txn)
        .await?
        .map(|u| u.display_name)
        .unwrap_or_else(|| "An approver".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approver::Status as A;
    use external_signer::Status as S;

    #[test]
    fn pending_until_all_approvers_decide() {
        assert_eq!(
            derive_status(&[A::Pending, A::Pending], &[S::Pending]),
            document::Status::PendingApproval
        );
        assert_eq!(
            derive_status(&[A::Approved, A::Pending], &[S::Pending]),
            document::Status::PendingApproval
        );
    }

    #[test]
    fn full_approval_moves_to_signing() {
        assert_eq!(
            derive_status(&[A::Approved, A::Approved], &[S::Pending]),
            document::Status::InProgress
        );
        assert_eq!(
            derive_status(&[A::Approved], &[S::Signed, S::Pending]),
            document::Status::InProgress
        );
    }

    #[test]
    fn any_rejection_wins() {
        assert_eq!(
            derive_status(&[A::Approved, A::Rejected], &[S::Pending]),
            document::Status::Rejected
        );
        assert_eq!(
            derive_status(&[A::Approved], &[S::Rejected, S::Signed]),
            document::Status::Rejected
        );
    }

    #[test]
    fn all_signed_completes() {
        assert_eq!(
            derive_status(&[A::Approved, A::Approved], &[S::Signed, S::Signed]),
            document::Status::Completed
        );
    }

    #[test]
    fn derivation_ignores_ordering() {
        let forward = [A::Approved, A::Rejected, A::Pending];
        let mut backward = forward;
        backward.reverse();
        assert_eq!(
            derive_status(&forward, &[S::Pending]),
            derive_status(&backward, &[S::Pending])
        );
    }
}
