use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Users table: one row per platform identity, created as a bare
        // placeholder the first time any edge or queue entry references it.
        if !manager.has_table("users").await? {
            manager
                .create_table(
                    Table::create()
                        .table(Users::Table)
                        .col(
                            ColumnDef::new(Users::GithubId)
                                .big_integer()
                                .not_null()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Users::Username).text())
                        .col(ColumnDef::new(Users::Name).text())
                        .col(ColumnDef::new(Users::AccountType).text())
                        .col(ColumnDef::new(Users::Gender).text())
                        .col(
                            ColumnDef::new(Users::HasPronouns)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(ColumnDef::new(Users::Location).text())
                        .col(ColumnDef::new(Users::AvatarUrl).text())
                        .col(ColumnDef::new(Users::ProfileUrl).text())
                        .col(ColumnDef::new(Users::Company).text())
                        .col(ColumnDef::new(Users::Following).integer())
                        .col(ColumnDef::new(Users::Followers).integer())
                        .col(ColumnDef::new(Users::Hireable).boolean())
                        .col(ColumnDef::new(Users::Bio).text())
                        .col(ColumnDef::new(Users::PublicRepos).integer())
                        .col(ColumnDef::new(Users::PublicGists).integer())
                        .col(ColumnDef::new(Users::TwitterUsername).text())
                        .col(ColumnDef::new(Users::Email).text())
                        .col(ColumnDef::new(Users::PrivateSponsorCount).integer())
                        .col(ColumnDef::new(Users::MinSponsorCostCents).big_integer())
                        .col(
                            ColumnDef::new(Users::IsEnriched)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(ColumnDef::new(Users::LastScraped).timestamp_with_time_zone())
                        .col(ColumnDef::new(Users::GithubCreatedAt).timestamp_with_time_zone())
                        .to_owned(),
                )
                .await?;
        }

        // Queue table: one entry per identity, priority-ordered backlog.
        if !manager.has_table("queue").await? {
            manager
                .create_table(
                    Table::create()
                        .table(Queue::Table)
                        .col(
                            ColumnDef::new(Queue::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(Queue::GithubId)
                                .big_integer()
                                .not_null()
                                .unique_key(),
                        )
                        .col(
                            ColumnDef::new(Queue::Priority)
                                .integer()
                                .not_null()
                                .default(1),
                        )
                        .col(
                            ColumnDef::new(Queue::Status)
                                .text()
                                .not_null()
                                .default("pending"),
                        )
                        .col(
                            ColumnDef::new(Queue::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null()
                                .default(Expr::current_timestamp()),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_foreign_key(
                    ForeignKey::create()
                        .name("fk_queue_github_id")
                        .from(Queue::Table, Queue::GithubId)
                        .to(Users::Table, Users::GithubId)
                        .on_delete(ForeignKeyAction::Cascade)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_queue_status_priority")
                        .table(Queue::Table)
                        .col(Queue::Status)
                        .col(Queue::Priority)
                        .to_owned(),
                )
                .await?;
        }

        // Active sponsorship edges, unique per (sponsor, sponsored) pair.
        if !manager.has_table("sponsorship").await? {
            manager
                .create_table(
                    Table::create()
                        .table(Sponsorship::Table)
                        .col(
                            ColumnDef::new(Sponsorship::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(Sponsorship::SponsorId)
                                .big_integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Sponsorship::SponsoredId)
                                .big_integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Sponsorship::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null()
                                .default(Expr::current_timestamp()),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("uq_sponsorship_pair")
                        .table(Sponsorship::Table)
                        .col(Sponsorship::SponsorId)
                        .col(Sponsorship::SponsoredId)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_foreign_key(
                    ForeignKey::create()
                        .name("fk_sponsorship_sponsor")
                        .from(Sponsorship::Table, Sponsorship::SponsorId)
                        .to(Users::Table, Users::GithubId)
                        .on_delete(ForeignKeyAction::Cascade)
                        .to_owned(),
                )
                .await?;

            manager
                .create_foreign_key(
                    ForeignKey::create()
                        .name("fk_sponsorship_sponsored")
                        .from(Sponsorship::Table, Sponsorship::SponsoredId)
                        .to(Users::Table, Users::GithubId)
                        .on_delete(ForeignKeyAction::Cascade)
                        .to_owned(),
                )
                .await?;
        }

        // Closed-interval history of removed edges, append-only.
        if !manager.has_table("sponsorship_history").await? {
            manager
                .create_table(
                    Table::create()
                        .table(SponsorshipHistory::Table)
                        .col(
                            ColumnDef::new(SponsorshipHistory::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(SponsorshipHistory::SponsorId)
                                .big_integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(SponsorshipHistory::SponsoredId)
                                .big_integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(SponsorshipHistory::StartedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(SponsorshipHistory::EndedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_sponsorship_history_sponsored")
                        .table(SponsorshipHistory::Table)
                        .col(SponsorshipHistory::SponsoredId)
                        .to_owned(),
                )
                .await?;
        }

        // Per-user, per-year contribution counters stored as JSONB.
        if !manager.has_table("user_activity").await? {
            manager
                .create_table(
                    Table::create()
                        .table(UserActivity::Table)
                        .col(
                            ColumnDef::new(UserActivity::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(UserActivity::UserId)
                                .big_integer()
                                .not_null(),
                        )
                        .col(ColumnDef::new(UserActivity::Year).integer().not_null())
                        .col(
                            ColumnDef::new(UserActivity::ActivityData)
                                .json_binary()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(UserActivity::LastUpdated)
                                .timestamp_with_time_zone()
                                .not_null()
                                .default(Expr::current_timestamp()),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("uq_user_activity_year")
                        .table(UserActivity::Table)
                        .col(UserActivity::UserId)
                        .col(UserActivity::Year)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_foreign_key(
                    ForeignKey::create()
                        .name("fk_user_activity_user")
                        .from(UserActivity::Table, UserActivity::UserId)
                        .to(Users::Table, Users::GithubId)
                        .on_delete(ForeignKeyAction::Cascade)
                        .to_owned(),
                )
                .await?;
        }

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(UserActivity::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(
                Table::drop()
                    .table(SponsorshipHistory::Table)
                    .if_exists()
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(Table::drop().table(Sponsorship::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Queue::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).if_exists().to_owned())
            .await?;

        Ok(())
    }
}

#[derive(Iden)]
enum Users {
    Table,
    GithubId,
    Username,
    Name,
    #[iden = "type"]
    AccountType,
    Gender,
    HasPronouns,
    Location,
    AvatarUrl,
    ProfileUrl,
    Company,
    Following,
    Followers,
    Hireable,
    Bio,
    PublicRepos,
    PublicGists,
    TwitterUsername,
    Email,
    PrivateSponsorCount,
    MinSponsorCostCents,
    IsEnriched,
    LastScraped,
    GithubCreatedAt,
}

#[derive(Iden)]
enum Queue {
    Table,
    Id,
    GithubId,
    Priority,
    Status,
    CreatedAt,
}

#[derive(Iden)]
enum Sponsorship {
    Table,
    Id,
    SponsorId,
    SponsoredId,
    CreatedAt,
}

#[derive(Iden)]
enum SponsorshipHistory {
    Table,
    Id,
    SponsorId,
    SponsoredId,
    StartedAt,
    EndedAt,
}

#[derive(Iden)]
enum UserActivity {
    Table,
    Id,
    UserId,
    Year,
    ActivityData,
    LastUpdated,
}
