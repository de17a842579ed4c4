use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "document")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub file_url: String,
    /// Caller-supplied idempotency key; re-submitting the same key returns
    /// the already-created document instead of duplicating rows.
    #[sea_orm(unique)]
    pub submission_key: Uuid,
    pub status: Status,
    #[sea_orm(indexed)]
    pub created_by: Uuid,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {
    Approver,
    ExternalSigner,
    ActivityEvent,
    Creator,
}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Self::Approver => Entity::has_many(super::approver::Entity).into(),
            Self::ExternalSigner => Entity::has_many(super::external_signer::Entity).into(),
            Self::ActivityEvent => Entity::has_many(super::activity_event::Entity).into(),
            Self::Creator => Entity::belongs_to(super::user::Entity)
                .from(Column::CreatedBy)
                .to(super::user::Column::Id)
                .into(),
        }
    }
}

impl Related<super::approver::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Approver.def()
    }
}

impl Related<super::external_signer::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ExternalSigner.def()
    }
}

impl Related<super::activity_event::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ActivityEvent.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Creator.def()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveActiveEnum, Eq, PartialEq)]
#[sea_orm(rs_type = "String", db_type = "String(Some(32))")]
pub enum Status {
    #[sea_orm(string_value = "DRAFT")]
    Draft,
    #[sea_orm(string_value = "PENDING_APPROVAL")]
    PendingApproval,
    #[sea_orm(string_value = "APPROVED")]
    Approved,
    #[sea_orm(string_value = "REJECTED")]
    Rejected,
    #[sea_orm(string_value = "IN_PROGRESS")]
    InProgress,
    #[sea_orm(string_value = "COMPLETED")]
    Completed,
}

impl Status {
    /// Terminal statuses never change again, no matter what the children do.
    pub fn is_terminal(self) -> bool {
        matches!(self, Status::Rejected | Status::Completed)
    }
}

impl ActiveModelBehavior for ActiveModel {}
