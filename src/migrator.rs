use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250101_000001_create_products_table::Migration),
            Box::new(m20250101_000002_create_orders_tables::Migration),
            Box::new(m20250101_000003_create_shipments_table::Migration),
            Box::new(m20250101_000004_create_service_bookings_table::Migration),
            Box::new(m20250101_000005_create_call_requests_table::Migration),
            Box::new(m20250101_000006_create_chat_messages_table::Migration),
            Box::new(m20250101_000007_create_notifications_table::Migration),
        ]
    }
}

async fn create_index(
    manager: &SchemaManager<'_>,
    name: &str,
    table: impl IntoIden + 'static,
    columns: Vec<DynIden>,
    unique: bool,
) -> Result<(), DbErr> {
    let mut index = Index::create();
    index.if_not_exists().name(name).table(table);
    for column in columns {
        index.col(column);
    }
    if unique {
        index.unique();
    }
    manager.create_index(index.to_owned()).await
}

mod m20250101_000001_create_products_table {
    use super::create_index;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000001_create_products_table"
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
                        .col(ColumnDef::new(Products::Sku).string_len(64).not_null())
                        .col(ColumnDef::new(Products::Name).string().not_null())
                        .col(ColumnDef::new(Products::Description).text().null())
                        .col(ColumnDef::new(Products::Category).string_len(100).not_null())
                        .col(ColumnDef::new(Products::Price).decimal_len(12, 2).not_null())
                        .col(ColumnDef::new(Products::Mrp).decimal_len(12, 2).null())
                        .col(
                            ColumnDef::new(Products::StockQuantity)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Products::Specifications).json().not_null())
                        .col(ColumnDef::new(Products::ImageUrls).json().not_null())
                        .col(
                            ColumnDef::new(Products::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(Products::IsFeatured)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
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
                        .to_owned(),
                )
                .await?;

            create_index(
                manager,
                "idx_products_sku",
                Products::Table,
                vec![Products::Sku.into_iden()],
                true,
            )
            .await?;
            create_index(
                manager,
                "idx_products_category",
                Products::Table,
                vec![Products::Category.into_iden()],
                false,
            )
            .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Products::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub enum Products {
        Table,
        Id,
        Sku,
        Name,
        Description,
        Category,
        Price,
        Mrp,
        StockQuantity,
        Specifications,
        ImageUrls,
        IsActive,
        IsFeatured,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20250101_000002_create_orders_tables {
    use super::create_index;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000002_create_orders_tables"
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
                        .col(ColumnDef::new(Orders::OrderNumber).string_len(32).not_null())
                        .col(ColumnDef::new(Orders::CustomerName).string().not_null())
                        .col(ColumnDef::new(Orders::CustomerEmail).string().not_null())
                        .col(ColumnDef::new(Orders::CustomerPhone).string_len(16).not_null())
                        .col(ColumnDef::new(Orders::AddressLine1).string().not_null())
                        .col(ColumnDef::new(Orders::AddressLine2).string().null())
                        .col(ColumnDef::new(Orders::City).string_len(100).not_null())
                        .col(ColumnDef::new(Orders::State).string_len(100).not_null())
                        .col(ColumnDef::new(Orders::Pincode).string_len(6).not_null())
                        .col(ColumnDef::new(Orders::Status).string_len(20).not_null())
                        .col(ColumnDef::new(Orders::PaymentMethod).string_len(16).not_null())
                        .col(ColumnDef::new(Orders::PaymentStatus).string_len(16).not_null())
                        .col(ColumnDef::new(Orders::Subtotal).decimal_len(12, 2).not_null())
                        .col(ColumnDef::new(Orders::ShippingFee).decimal_len(12, 2).not_null())
                        .col(ColumnDef::new(Orders::Total).decimal_len(12, 2).not_null())
                        .col(ColumnDef::new(Orders::Currency).string_len(3).not_null())
                        .col(ColumnDef::new(Orders::Notes).text().null())
                        .col(ColumnDef::new(Orders::TrackingNumber).string_len(64).null())
                        .col(ColumnDef::new(Orders::CourierName).string().null())
                        .col(ColumnDef::new(Orders::CancellationReason).text().null())
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
                        .to_owned(),
                )
                .await?;

            create_index(
                manager,
                "idx_orders_order_number",
                Orders::Table,
                vec![Orders::OrderNumber.into_iden()],
                true,
            )
            .await?;
            create_index(
                manager,
                "idx_orders_status",
                Orders::Table,
                vec![Orders::Status.into_iden()],
                false,
            )
            .await?;
            create_index(
                manager,
                "idx_orders_customer_email",
                Orders::Table,
                vec![Orders::CustomerEmail.into_iden()],
                false,
            )
            .await?;

            manager
                .create_table(
                    Table::create()
                        .table(OrderItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(OrderItems::Id)
                                .uuid()
                                .not_null()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(OrderItems::OrderId).uuid().not_null())
                        .col(ColumnDef::new(OrderItems::ProductId).uuid().not_null())
                        .col(ColumnDef::new(OrderItems::ProductName).string().not_null())
                        .col(ColumnDef::new(OrderItems::Sku).string_len(64).not_null())
                        .col(
                            ColumnDef::new(OrderItems::UnitPrice)
                                .decimal_len(12, 2)
                                .not_null(),
                        )
                        .col(ColumnDef::new(OrderItems::Quantity).integer().not_null())
                        .col(
                            ColumnDef::new(OrderItems::LineTotal)
                                .decimal_len(12, 2)
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_order_items_order")
                                .from(OrderItems::Table, OrderItems::OrderId)
                                .to(Orders::Table, Orders::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            create_index(
                manager,
                "idx_order_items_order_id",
                OrderItems::Table,
                vec![OrderItems::OrderId.into_iden()],
                false,
            )
            .await?;
            create_index(
                manager,
                "idx_order_items_product_id",
                OrderItems::Table,
                vec![OrderItems::ProductId.into_iden()],
                false,
            )
            .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(OrderItems::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Orders::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub enum Orders {
        Table,
        Id,
        OrderNumber,
        CustomerName,
        CustomerEmail,
        CustomerPhone,
        AddressLine1,
        AddressLine2,
        City,
        State,
        Pincode,
        Status,
        PaymentMethod,
        PaymentStatus,
        Subtotal,
        ShippingFee,
        Total,
        Currency,
        Notes,
        TrackingNumber,
        CourierName,
        CancellationReason,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    pub enum OrderItems {
        Table,
        Id,
        OrderId,
        ProductId,
        ProductName,
        Sku,
        UnitPrice,
        Quantity,
        LineTotal,
    }
}

mod m20250101_000003_create_shipments_table {
    use super::create_index;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000003_create_shipments_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Shipments::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Shipments::Id)
                                .uuid()
                                .not_null()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Shipments::OrderId).uuid().not_null())
                        .col(ColumnDef::new(Shipments::Provider).string_len(32).not_null())
                        .col(ColumnDef::new(Shipments::ProviderOrderId).string().null())
                        .col(ColumnDef::new(Shipments::ProviderShipmentId).string().null())
                        .col(ColumnDef::new(Shipments::AwbCode).string_len(64).null())
                        .col(ColumnDef::new(Shipments::CourierId).big_integer().null())
                        .col(ColumnDef::new(Shipments::CourierName).string().null())
                        .col(ColumnDef::new(Shipments::Status).string_len(20).not_null())
                        .col(ColumnDef::new(Shipments::WeightKg).double().not_null())
                        .col(
                            ColumnDef::new(Shipments::ChargeableWeightKg)
                                .double()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Shipments::LengthCm).double().not_null())
                        .col(ColumnDef::new(Shipments::BreadthCm).double().not_null())
                        .col(ColumnDef::new(Shipments::HeightCm).double().not_null())
                        .col(
                            ColumnDef::new(Shipments::Estimated)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Shipments::FreightCharge)
                                .decimal_len(12, 2)
                                .null(),
                        )
                        .col(
                            ColumnDef::new(Shipments::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Shipments::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Shipments::DeliveredAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(Shipments::CancelledAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_shipments_order")
                                .from(Shipments::Table, Shipments::OrderId)
                                .to(Orders::Table, Orders::Id),
                        )
                        .to_owned(),
                )
                .await?;

            create_index(
                manager,
                "idx_shipments_order_id",
                Shipments::Table,
                vec![Shipments::OrderId.into_iden()],
                false,
            )
            .await?;
            create_index(
                manager,
                "idx_shipments_status",
                Shipments::Table,
                vec![Shipments::Status.into_iden()],
                false,
            )
            .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Shipments::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub enum Orders {
        Table,
        Id,
    }

    #[derive(DeriveIden)]
    pub enum Shipments {
        Table,
        Id,
        OrderId,
        Provider,
        ProviderOrderId,
        ProviderShipmentId,
        AwbCode,
        CourierId,
        CourierName,
        Status,
        WeightKg,
        ChargeableWeightKg,
        LengthCm,
        BreadthCm,
        HeightCm,
        Estimated,
        FreightCharge,
        CreatedAt,
        UpdatedAt,
        DeliveredAt,
        CancelledAt,
    }
}

mod m20250101_000004_create_service_bookings_table {
    use super::create_index;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000004_create_service_bookings_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(ServiceBookings::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ServiceBookings::Id)
                                .uuid()
                                .not_null()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(ServiceBookings::BookingNumber)
                                .string_len(32)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ServiceBookings::CustomerName)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ServiceBookings::CustomerPhone)
                                .string_len(16)
                                .not_null(),
                        )
                        .col(ColumnDef::new(ServiceBookings::CustomerEmail).string().null())
                        .col(ColumnDef::new(ServiceBookings::Address).text().not_null())
                        .col(
                            ColumnDef::new(ServiceBookings::Pincode)
                                .string_len(6)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ServiceBookings::ServiceType)
                                .string_len(32)
                                .not_null(),
                        )
                        .col(ColumnDef::new(ServiceBookings::ProductId).uuid().null())
                        .col(ColumnDef::new(ServiceBookings::OrderId).uuid().null())
                        .col(
                            ColumnDef::new(ServiceBookings::PreferredDate)
                                .date()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ServiceBookings::TimeSlot)
                                .string_len(16)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ServiceBookings::IssueDescription)
                                .text()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(ServiceBookings::Status)
                                .string_len(20)
                                .not_null(),
                        )
                        .col(ColumnDef::new(ServiceBookings::TechnicianName).string().null())
                        .col(
                            ColumnDef::new(ServiceBookings::TechnicianPhone)
                                .string_len(16)
                                .null(),
                        )
                        .col(ColumnDef::new(ServiceBookings::Notes).text().null())
                        .col(
                            ColumnDef::new(ServiceBookings::CancellationReason)
                                .text()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(ServiceBookings::ConfirmedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(ServiceBookings::StartedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(ServiceBookings::CompletedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(ServiceBookings::CancelledAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(ServiceBookings::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ServiceBookings::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            create_index(
                manager,
                "idx_service_bookings_number",
                ServiceBookings::Table,
                vec![ServiceBookings::BookingNumber.into_iden()],
                true,
            )
            .await?;
            create_index(
                manager,
                "idx_service_bookings_status_date",
                ServiceBookings::Table,
                vec![
                    ServiceBookings::Status.into_iden(),
                    ServiceBookings::PreferredDate.into_iden(),
                ],
                false,
            )
            .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(ServiceBookings::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub enum ServiceBookings {
        Table,
        Id,
        BookingNumber,
        CustomerName,
        CustomerPhone,
        CustomerEmail,
        Address,
        Pincode,
        ServiceType,
        ProductId,
        OrderId,
        PreferredDate,
        TimeSlot,
        IssueDescription,
        Status,
        TechnicianName,
        TechnicianPhone,
        Notes,
        CancellationReason,
        ConfirmedAt,
        StartedAt,
        CompletedAt,
        CancelledAt,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20250101_000005_create_call_requests_table {
    use super::create_index;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000005_create_call_requests_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(CallRequests::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(CallRequests::Id)
                                .uuid()
                                .not_null()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(CallRequests::Name).string().not_null())
                        .col(ColumnDef::new(CallRequests::Phone).string_len(16).not_null())
                        .col(ColumnDef::new(CallRequests::Reason).string().not_null())
                        .col(ColumnDef::new(CallRequests::Message).text().null())
                        .col(ColumnDef::new(CallRequests::PreferredTime).string().null())
                        .col(ColumnDef::new(CallRequests::Source).string_len(16).not_null())
                        .col(ColumnDef::new(CallRequests::ProductId).uuid().null())
                        .col(ColumnDef::new(CallRequests::Priority).string_len(16).not_null())
                        .col(ColumnDef::new(CallRequests::Status).string_len(16).not_null())
                        .col(ColumnDef::new(CallRequests::Notes).text().null())
                        .col(
                            ColumnDef::new(CallRequests::ContactedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(CallRequests::ResolvedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(CallRequests::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(CallRequests::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            create_index(
                manager,
                "idx_call_requests_phone_created",
                CallRequests::Table,
                vec![
                    CallRequests::Phone.into_iden(),
                    CallRequests::CreatedAt.into_iden(),
                ],
                false,
            )
            .await?;
            create_index(
                manager,
                "idx_call_requests_status",
                CallRequests::Table,
                vec![CallRequests::Status.into_iden()],
                false,
            )
            .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(CallRequests::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub enum CallRequests {
        Table,
        Id,
        Name,
        Phone,
        Reason,
        Message,
        PreferredTime,
        Source,
        ProductId,
        Priority,
        Status,
        Notes,
        ContactedAt,
        ResolvedAt,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20250101_000006_create_chat_messages_table {
    use super::create_index;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000006_create_chat_messages_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(ChatMessages::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ChatMessages::Id)
                                .uuid()
                                .not_null()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(ChatMessages::SessionId)
                                .string_len(64)
                                .not_null(),
                        )
                        .col(ColumnDef::new(ChatMessages::Role).string_len(8).not_null())
                        .col(ColumnDef::new(ChatMessages::Content).text().not_null())
                        .col(ColumnDef::new(ChatMessages::Intent).string_len(32).null())
                        .col(
                            ColumnDef::new(ChatMessages::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            create_index(
                manager,
                "idx_chat_messages_session",
                ChatMessages::Table,
                vec![
                    ChatMessages::SessionId.into_iden(),
                    ChatMessages::CreatedAt.into_iden(),
                ],
                false,
            )
            .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(ChatMessages::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub enum ChatMessages {
        Table,
        Id,
        SessionId,
        Role,
        Content,
        Intent,
        CreatedAt,
    }
}

mod m20250101_000007_create_notifications_table {
    use super::create_index;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000007_create_notifications_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Notifications::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Notifications::Id)
                                .uuid()
                                .not_null()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Notifications::Kind).string_len(20).not_null())
                        .col(ColumnDef::new(Notifications::Title).string().not_null())
                        .col(ColumnDef::new(Notifications::Message).text().not_null())
                        .col(ColumnDef::new(Notifications::ReferenceId).uuid().null())
                        .col(
                            ColumnDef::new(Notifications::Priority)
                                .string_len(8)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Notifications::IsRead)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Notifications::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Notifications::ReadAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .to_owned(),
                )
                .await?;

            create_index(
                manager,
                "idx_notifications_unread",
                Notifications::Table,
                vec![
                    Notifications::IsRead.into_iden(),
                    Notifications::CreatedAt.into_iden(),
                ],
                false,
            )
            .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Notifications::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub enum Notifications {
        Table,
        Id,
        Kind,
        Title,
        Message,
        ReferenceId,
        Priority,
        IsRead,
        CreatedAt,
        ReadAt,
    }
}
