use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240601_000001_create_chapters_table::Migration),
            Box::new(m20240601_000002_create_users_table::Migration),
            Box::new(m20240601_000003_create_application_tables::Migration),
            Box::new(m20240601_000004_create_catalog_tables::Migration),
            Box::new(m20240601_000005_create_orders_table::Migration),
            Box::new(m20240601_000006_create_processed_webhooks_table::Migration),
        ]
    }
}

mod m20240601_000001_create_chapters_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240601_000001_create_chapters_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Chapters::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Chapters::Id).uuid().not_null().primary_key())
                        .col(
                            ColumnDef::new(Chapters::Name)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Chapters::ChapterType).string_len(20).not_null())
                        .col(ColumnDef::new(Chapters::Province).string().not_null())
                        .col(ColumnDef::new(Chapters::City).string().not_null())
                        .col(ColumnDef::new(Chapters::State).string().not_null())
                        .col(ColumnDef::new(Chapters::Status).string_len(20).not_null())
                        .col(ColumnDef::new(Chapters::StripeAccountId).string().null())
                        .col(ColumnDef::new(Chapters::ContactEmail).string().null())
                        .col(ColumnDef::new(Chapters::SocialLinks).json().null())
                        .col(
                            ColumnDef::new(Chapters::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Chapters::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_chapters_status")
                        .table(Chapters::Table)
                        .col(Chapters::Status)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Chapters::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(crate) enum Chapters {
        Table,
        Id,
        Name,
        ChapterType,
        Province,
        City,
        State,
        Status,
        StripeAccountId,
        ContactEmail,
        SocialLinks,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240601_000002_create_users_table {
    use super::m20240601_000001_create_chapters_table::Chapters;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240601_000002_create_users_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Users::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Users::Id).uuid().not_null().primary_key())
                        .col(
                            ColumnDef::new(Users::IdpSubject)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Users::Email).string().not_null().unique_key())
                        .col(ColumnDef::new(Users::Name).string().not_null())
                        .col(ColumnDef::new(Users::Role).string_len(20).not_null())
                        .col(
                            ColumnDef::new(Users::IsMember)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(ColumnDef::new(Users::MembershipNumber).string().null())
                        .col(ColumnDef::new(Users::ChapterId).uuid().null())
                        .col(
                            ColumnDef::new(Users::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Users::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_users_chapter")
                                .from(Users::Table, Users::ChapterId)
                                .to(Chapters::Table, Chapters::Id)
                                .on_delete(ForeignKeyAction::SetNull),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Users::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(crate) enum Users {
        Table,
        Id,
        IdpSubject,
        Email,
        Name,
        Role,
        IsMember,
        MembershipNumber,
        ChapterId,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240601_000003_create_application_tables {
    use super::m20240601_000001_create_chapters_table::Chapters;
    use super::m20240601_000002_create_users_table::Users;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240601_000003_create_application_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Sellers::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Sellers::Id).uuid().not_null().primary_key())
                        .col(ColumnDef::new(Sellers::UserId).uuid().not_null().unique_key())
                        .col(ColumnDef::new(Sellers::BusinessName).string().not_null())
                        .col(ColumnDef::new(Sellers::Email).string().not_null())
                        .col(ColumnDef::new(Sellers::VendorLicenseNumber).string().null())
                        .col(ColumnDef::new(Sellers::SponsoringChapterId).uuid().null())
                        .col(ColumnDef::new(Sellers::ShipFromPostalCode).string().null())
                        .col(ColumnDef::new(Sellers::StripeAccountId).string().null())
                        .col(ColumnDef::new(Sellers::Status).string_len(20).not_null())
                        .col(ColumnDef::new(Sellers::ReviewNotes).text().null())
                        .col(
                            ColumnDef::new(Sellers::ReviewedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(ColumnDef::new(Sellers::SocialLinks).json().null())
                        .col(
                            ColumnDef::new(Sellers::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Sellers::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_sellers_user")
                                .from(Sellers::Table, Sellers::UserId)
                                .to(Users::Table, Users::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_sellers_chapter")
                                .from(Sellers::Table, Sellers::SponsoringChapterId)
                                .to(Chapters::Table, Chapters::Id)
                                .on_delete(ForeignKeyAction::SetNull),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Promoters::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Promoters::Id).uuid().not_null().primary_key())
                        .col(
                            ColumnDef::new(Promoters::UserId)
                                .uuid()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Promoters::Name).string().not_null())
                        .col(ColumnDef::new(Promoters::Email).string().not_null())
                        .col(ColumnDef::new(Promoters::SponsoringChapterId).uuid().null())
                        .col(ColumnDef::new(Promoters::StripeAccountId).string().null())
                        .col(ColumnDef::new(Promoters::Status).string_len(20).not_null())
                        .col(ColumnDef::new(Promoters::ReviewNotes).text().null())
                        .col(
                            ColumnDef::new(Promoters::ReviewedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(ColumnDef::new(Promoters::SocialLinks).json().null())
                        .col(
                            ColumnDef::new(Promoters::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Promoters::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_promoters_user")
                                .from(Promoters::Table, Promoters::UserId)
                                .to(Users::Table, Users::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_promoters_chapter")
                                .from(Promoters::Table, Promoters::SponsoringChapterId)
                                .to(Chapters::Table, Chapters::Id)
                                .on_delete(ForeignKeyAction::SetNull),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Stewards::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Stewards::Id).uuid().not_null().primary_key())
                        .col(
                            ColumnDef::new(Stewards::UserId)
                                .uuid()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Stewards::SponsoringChapterId).uuid().not_null())
                        .col(ColumnDef::new(Stewards::ShipFromPostalCode).string().not_null())
                        .col(ColumnDef::new(Stewards::Status).string_len(20).not_null())
                        .col(ColumnDef::new(Stewards::ReviewNotes).text().null())
                        .col(
                            ColumnDef::new(Stewards::ReviewedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(Stewards::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Stewards::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_stewards_user")
                                .from(Stewards::Table, Stewards::UserId)
                                .to(Users::Table, Users::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_stewards_chapter")
                                .from(Stewards::Table, Stewards::SponsoringChapterId)
                                .to(Chapters::Table, Chapters::Id)
                                .on_delete(ForeignKeyAction::Restrict),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_sellers_status")
                        .table(Sellers::Table)
                        .col(Sellers::Status)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_promoters_status")
                        .table(Promoters::Table)
                        .col(Promoters::Status)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_stewards_status")
                        .table(Stewards::Table)
                        .col(Stewards::Status)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Stewards::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Promoters::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Sellers::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(crate) enum Sellers {
        Table,
        Id,
        UserId,
        BusinessName,
        Email,
        VendorLicenseNumber,
        SponsoringChapterId,
        ShipFromPostalCode,
        StripeAccountId,
        Status,
        ReviewNotes,
        ReviewedAt,
        SocialLinks,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    pub(crate) enum Promoters {
        Table,
        Id,
        UserId,
        Name,
        Email,
        SponsoringChapterId,
        StripeAccountId,
        Status,
        ReviewNotes,
        ReviewedAt,
        SocialLinks,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    pub(crate) enum Stewards {
        Table,
        Id,
        UserId,
        SponsoringChapterId,
        ShipFromPostalCode,
        Status,
        ReviewNotes,
        ReviewedAt,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240601_000004_create_catalog_tables {
    use super::m20240601_000001_create_chapters_table::Chapters;
    use super::m20240601_000002_create_users_table::Users;
    use super::m20240601_000003_create_application_tables::{Promoters, Sellers, Stewards};
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240601_000004_create_catalog_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Products::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Products::Id).uuid().not_null().primary_key())
                        .col(ColumnDef::new(Products::SellerId).uuid().not_null())
                        .col(ColumnDef::new(Products::Name).string().not_null())
                        .col(ColumnDef::new(Products::Description).text().not_null())
                        .col(ColumnDef::new(Products::PriceCents).big_integer().not_null())
                        .col(ColumnDef::new(Products::ImageUrl).string().null())
                        .col(ColumnDef::new(Products::Category).string().null())
                        .col(
                            ColumnDef::new(Products::IsKappaBranded)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Products::StockQuantity)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Products::WeightOz).integer().null())
                        .col(ColumnDef::new(Products::Status).string_len(20).not_null())
                        .col(
                            ColumnDef::new(Products::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Products::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_products_seller")
                                .from(Products::Table, Products::SellerId)
                                .to(Sellers::Table, Sellers::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Events::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Events::Id).uuid().not_null().primary_key())
                        .col(ColumnDef::new(Events::PromoterId).uuid().not_null())
                        .col(ColumnDef::new(Events::SponsoringChapterId).uuid().null())
                        .col(ColumnDef::new(Events::Title).string().not_null())
                        .col(ColumnDef::new(Events::Description).text().not_null())
                        .col(ColumnDef::new(Events::Location).string().not_null())
                        .col(ColumnDef::new(Events::City).string().null())
                        .col(ColumnDef::new(Events::State).string().null())
                        .col(
                            ColumnDef::new(Events::StartsAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Events::EndsAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Events::TicketPriceCents)
                                .big_integer()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Events::Capacity).integer().null())
                        .col(
                            ColumnDef::new(Events::TicketsSold)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Events::IsKappaBranded)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(ColumnDef::new(Events::ImageUrl).string().null())
                        .col(ColumnDef::new(Events::Features).json().null())
                        .col(ColumnDef::new(Events::Status).string_len(20).not_null())
                        .col(
                            ColumnDef::new(Events::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Events::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_events_promoter")
                                .from(Events::Table, Events::PromoterId)
                                .to(Promoters::Table, Promoters::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_events_chapter")
                                .from(Events::Table, Events::SponsoringChapterId)
                                .to(Chapters::Table, Chapters::Id)
                                .on_delete(ForeignKeyAction::SetNull),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(StewardListings::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(StewardListings::Id)
                                .uuid()
                                .not_null()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(StewardListings::StewardId).uuid().not_null())
                        .col(
                            ColumnDef::new(StewardListings::SponsoringChapterId)
                                .uuid()
                                .not_null(),
                        )
                        .col(ColumnDef::new(StewardListings::Name).string().not_null())
                        .col(ColumnDef::new(StewardListings::Description).text().not_null())
                        .col(ColumnDef::new(StewardListings::ImageUrl).string().null())
                        .col(
                            ColumnDef::new(StewardListings::ShippingCents)
                                .big_integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StewardListings::ChapterDonationCents)
                                .big_integer()
                                .not_null(),
                        )
                        .col(ColumnDef::new(StewardListings::WeightOz).integer().null())
                        .col(
                            ColumnDef::new(StewardListings::IsKappaBranded)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(StewardListings::Status)
                                .string_len(20)
                                .not_null(),
                        )
                        .col(ColumnDef::new(StewardListings::ClaimedBy).uuid().null())
                        .col(
                            ColumnDef::new(StewardListings::ClaimedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(StewardListings::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StewardListings::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_steward_listings_steward")
                                .from(StewardListings::Table, StewardListings::StewardId)
                                .to(Stewards::Table, Stewards::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_steward_listings_chapter")
                                .from(StewardListings::Table, StewardListings::SponsoringChapterId)
                                .to(Chapters::Table, Chapters::Id)
                                .on_delete(ForeignKeyAction::Restrict),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_steward_listings_claimed_by")
                                .from(StewardListings::Table, StewardListings::ClaimedBy)
                                .to(Users::Table, Users::Id)
                                .on_delete(ForeignKeyAction::SetNull),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_products_seller_status")
                        .table(Products::Table)
                        .col(Products::SellerId)
                        .col(Products::Status)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_events_status_starts_at")
                        .table(Events::Table)
                        .col(Events::Status)
                        .col(Events::StartsAt)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_steward_listings_status")
                        .table(StewardListings::Table)
                        .col(StewardListings::Status)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(StewardListings::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Events::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Products::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(crate) enum Products {
        Table,
        Id,
        SellerId,
        Name,
        Description,
        PriceCents,
        ImageUrl,
        Category,
        IsKappaBranded,
        StockQuantity,
        WeightOz,
        Status,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    pub(crate) enum Events {
        Table,
        Id,
        PromoterId,
        SponsoringChapterId,
        Title,
        Description,
        Location,
        City,
        State,
        StartsAt,
        EndsAt,
        TicketPriceCents,
        Capacity,
        TicketsSold,
        IsKappaBranded,
        ImageUrl,
        Features,
        Status,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    pub(crate) enum StewardListings {
        Table,
        Id,
        StewardId,
        SponsoringChapterId,
        Name,
        Description,
        ImageUrl,
        ShippingCents,
        ChapterDonationCents,
        WeightOz,
        IsKappaBranded,
        Status,
        ClaimedBy,
        ClaimedAt,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240601_000005_create_orders_table {
    use super::m20240601_000001_create_chapters_table::Chapters;
    use super::m20240601_000002_create_users_table::Users;
    use super::m20240601_000004_create_catalog_tables::{Events, Products, StewardListings};
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240601_000005_create_orders_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Orders::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Orders::Id).uuid().not_null().primary_key())
                        .col(ColumnDef::new(Orders::UserId).uuid().not_null())
                        .col(ColumnDef::new(Orders::Kind).string_len(20).not_null())
                        .col(ColumnDef::new(Orders::ProductId).uuid().null())
                        .col(ColumnDef::new(Orders::EventId).uuid().null())
                        .col(ColumnDef::new(Orders::ListingId).uuid().null())
                        .col(ColumnDef::new(Orders::Quantity).integer().not_null())
                        .col(ColumnDef::new(Orders::UnitPriceCents).big_integer().not_null())
                        .col(ColumnDef::new(Orders::SubtotalCents).big_integer().not_null())
                        .col(ColumnDef::new(Orders::ShippingCents).big_integer().not_null())
                        .col(
                            ColumnDef::new(Orders::PlatformFeeCents)
                                .big_integer()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Orders::DonationCents).big_integer().not_null())
                        .col(ColumnDef::new(Orders::TotalCents).big_integer().not_null())
                        .col(
                            ColumnDef::new(Orders::ChapterShareCents)
                                .big_integer()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Orders::Currency).string_len(3).not_null())
                        .col(ColumnDef::new(Orders::ChapterId).uuid().null())
                        .col(ColumnDef::new(Orders::PayeeAccountId).string().null())
                        .col(ColumnDef::new(Orders::StripeSessionId).string().null())
                        .col(ColumnDef::new(Orders::PaymentIntentId).string().null())
                        .col(ColumnDef::new(Orders::CheckoutUrl).text().null())
                        .col(ColumnDef::new(Orders::Status).string_len(20).not_null())
                        .col(ColumnDef::new(Orders::ShippingAddress).json().null())
                        .col(
                            ColumnDef::new(Orders::PaidAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(Orders::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Orders::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_orders_user")
                                .from(Orders::Table, Orders::UserId)
                                .to(Users::Table, Users::Id)
                                .on_delete(ForeignKeyAction::Restrict),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_orders_product")
                                .from(Orders::Table, Orders::ProductId)
                                .to(Products::Table, Products::Id)
                                .on_delete(ForeignKeyAction::SetNull),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_orders_event")
                                .from(Orders::Table, Orders::EventId)
                                .to(Events::Table, Events::Id)
                                .on_delete(ForeignKeyAction::SetNull),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_orders_listing")
                                .from(Orders::Table, Orders::ListingId)
                                .to(StewardListings::Table, StewardListings::Id)
                                .on_delete(ForeignKeyAction::SetNull),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_orders_chapter")
                                .from(Orders::Table, Orders::ChapterId)
                                .to(Chapters::Table, Chapters::Id)
                                .on_delete(ForeignKeyAction::SetNull),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_orders_user_id")
                        .table(Orders::Table)
                        .col(Orders::UserId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_orders_stripe_session_id")
                        .table(Orders::Table)
                        .col(Orders::StripeSessionId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_orders_payment_intent_id")
                        .table(Orders::Table)
                        .col(Orders::PaymentIntentId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_orders_status")
                        .table(Orders::Table)
                        .col(Orders::Status)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Orders::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Orders {
        Table,
        Id,
        UserId,
        Kind,
        ProductId,
        EventId,
        ListingId,
        Quantity,
        UnitPriceCents,
        SubtotalCents,
        ShippingCents,
        PlatformFeeCents,
        DonationCents,
        TotalCents,
        ChapterShareCents,
        Currency,
        ChapterId,
        PayeeAccountId,
        StripeSessionId,
        PaymentIntentId,
        CheckoutUrl,
        Status,
        ShippingAddress,
        PaidAt,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240601_000006_create_processed_webhooks_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240601_000006_create_processed_webhooks_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(ProcessedWebhooks::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ProcessedWebhooks::EventId)
                                .string()
                                .not_null()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(ProcessedWebhooks::EventType).string().not_null())
                        .col(
                            ColumnDef::new(ProcessedWebhooks::ReceivedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(ProcessedWebhooks::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum ProcessedWebhooks {
        Table,
        EventId,
        EventType,
        ReceivedAt,
    }
}
