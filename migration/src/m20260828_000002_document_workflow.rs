use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(DeriveIden)]
#[sea_orm(iden = "user")]
enum User {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Document {
    Table,
    Id,
    Title,
    Description,
    FileUrl,
    SubmissionKey,
    Status,
    CreatedBy,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Approver {
    Table,
    Id,
    DocumentId,
    UserId,
    Position,
    Status,
    Comments,
    DecidedAt,
}

#[derive(DeriveIden)]
enum ExternalSigner {
    Table,
    Id,
    DocumentId,
    Name,
    Designation,
    Position,
    Status,
    Comments,
    SignedAt,
}

#[derive(DeriveIden)]
enum ActivityEvent {
    Table,
    Id,
    DocumentId,
    ActorId,
    Kind,
    Message,
    CreatedAt,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Document::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Document::Id)
                            .uuid()
                            .not_null()
                            .primary_key()
                            .default(Expr::cust("gen_random_uuid()")),
                    )
                    .col(ColumnDef::new(Document::Title).string_len(256).not_null())
                    .col(ColumnDef::new(Document::Description).text())
                    .col(ColumnDef::new(Document::FileUrl).string_len(1024).not_null())
                    .col(
                        ColumnDef::new(Document::SubmissionKey)
                            .uuid()
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(Document::Status)
                            .string_len(32)
                            .not_null()
                            .default("PENDING_APPROVAL"),
                    )
                    .col(ColumnDef::new(Document::CreatedBy).uuid().not_null())
                    .col(
                        ColumnDef::new(Document::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("now()")),
                    )
                    .col(
                        ColumnDef::new(Document::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("now()")),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_foreign_key(
                ForeignKey::create()
                    .name("fk_document_creator")
                    .from(Document::Table, Document::CreatedBy)
                    .to(User::Table, User::Id)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_document_status")
                    .table(Document::Table)
                    .col(Document::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_document_created_by")
                    .table(Document::Table)
                    .col(Document::CreatedBy)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Approver::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Approver::Id)
                            .uuid()
                            .not_null()
                            .primary_key()
                            .default(Expr::cust("gen_random_uuid()")),
                    )
                    .col(ColumnDef::new(Approver::DocumentId).uuid().not_null())
                    .col(ColumnDef::new(Approver::UserId).uuid().not_null())
                    .col(
                        ColumnDef::new(Approver::Position)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Approver::Status)
                            .string_len(32)
                            .not_null()
                            .default("PENDING"),
                    )
                    .col(ColumnDef::new(Approver::Comments).text())
                    .col(ColumnDef::new(Approver::DecidedAt).timestamp_with_time_zone())
                    .index(
                        Index::create()
                            .name("idx_approver_document_user")
                            .col(Approver::DocumentId)
                            .col(Approver::UserId)
                            .unique(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_foreign_key(
                ForeignKey::create()
                    .name("fk_approver_document")
                    .from(Approver::Table, Approver::DocumentId)
                    .to(Document::Table, Document::Id)
                    .on_delete(ForeignKeyAction::Cascade)
                    .to_owned(),
            )
            .await?;

        manager
            .create_foreign_key(
                ForeignKey::create()
                    .name("fk_approver_user")
                    .from(Approver::Table, Approver::UserId)
                    .to(User::Table, User::Id)
                    .on_delete(ForeignKeyAction::Cascade)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ExternalSigner::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ExternalSigner::Id)
                            .uuid()
                            .not_null()
                            .primary_key()
                            .default(Expr::cust("gen_random_uuid()")),
                    )
                    .col(ColumnDef::new(ExternalSigner::DocumentId).uuid().not_null())
                    .col(
                        ColumnDef::new(ExternalSigner::Name)
                            .string_len(256)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ExternalSigner::Designation)
                            .string_len(256)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ExternalSigner::Position)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(ExternalSigner::Status)
                            .string_len(32)
                            .not_null()
                            .default("PENDING"),
                    )
                    .col(ColumnDef::new(ExternalSigner::Comments).text())
                    .col(
                        ColumnDef::new(ExternalSigner::SignedAt).timestamp_with_time_zone(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_foreign_key(
                ForeignKey::create()
                    .name("fk_external_signer_document")
                    .from(ExternalSigner::Table, ExternalSigner::DocumentId)
                    .to(Document::Table, Document::Id)
                    .on_delete(ForeignKeyAction::Cascade)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_external_signer_document")
                    .table(ExternalSigner::Table)
                    .col(ExternalSigner::DocumentId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ActivityEvent::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ActivityEvent::Id)
                            .uuid()
                            .not_null()
                            .primary_key()
                            .default(Expr::cust("gen_random_uuid()")),
                    )
                    .col(ColumnDef::new(ActivityEvent::DocumentId).uuid().not_null())
                    .col(ColumnDef::new(ActivityEvent::ActorId).uuid())
                    .col(
                        ColumnDef::new(ActivityEvent::Kind)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(ColumnDef::new(ActivityEvent::Message).text().not_null())
                    .col(
                        ColumnDef::new(ActivityEvent::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("now()")),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_foreign_key(
                ForeignKey::create()
                    .name("fk_activity_event_document")
                    .from(ActivityEvent::Table, ActivityEvent::DocumentId)
                    .to(Document::Table, Document::Id)
                    .on_delete(ForeignKeyAction::Cascade)
                    .to_owned(),
            )
            .await?;

        manager
            .create_foreign_key(
                ForeignKey::create()
                    .name("fk_activity_event_actor")
                    .from(ActivityEvent::Table, ActivityEvent::ActorId)
                    .to(User::Table, User::Id)
                    .on_delete(ForeignKeyAction::SetNull)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_activity_event_document_created")
                    .table(ActivityEvent::Table)
                    .col(ActivityEvent::DocumentId)
                    .col(ActivityEvent::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(
                Table::drop()
                    .table(ActivityEvent::Table)
                    .if_exists()
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(
                Table::drop()
                    .table(ExternalSigner::Table)
                    .if_exists()
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(Table::drop().table(Approver::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Document::Table).if_exists().to_owned())
            .await?;
        Ok(())
    }
}
