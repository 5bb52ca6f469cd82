//! Store-level rules: uniqueness, cascades and restricted deletes.

mod common;

use assert_matches::assert_matches;
use catstore::{
    entities::{cat_breed, cat_info, commodity, order_item, purchase_order_item, CatState, LineItem},
    errors::ServiceError,
    services::{
        breeds::BreedInput,
        cats::CatInput,
        commodity_orders::{CommodityOrderHeader, NewCommodityOrder},
        purchase_orders::{NewPurchaseOrder, PurchaseOrderHeader},
    },
};
use chrono::{Duration, Local, NaiveDate};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter, Set,
};
use std::collections::HashSet;

fn sale(items: Vec<LineItem>) -> NewCommodityOrder {
    NewCommodityOrder {
        header: CommodityOrderHeader {
            customer_phone: "13800001111".to_string(),
            transaction_time: None,
            total_amount: Decimal::new(12_800, 2),
        },
        items,
    }
}

fn restock(items: Vec<LineItem>) -> NewPurchaseOrder {
    NewPurchaseOrder {
        header: PurchaseOrderHeader {
            supplier_phone: "02088886666".to_string(),
            transaction_time: None,
            total_amount: Decimal::new(50_000, 2),
        },
        items,
    }
}

fn line(commodity_id: i32, quantity: i32) -> LineItem {
    LineItem {
        commodity_id,
        quantity,
    }
}

#[tokio::test]
async fn breed_names_are_unique() {
    let app = common::TestApp::new().await;
    let result = app
        .state
        .services
        .breeds
        .create(BreedInput {
            breed_name: "布偶猫".to_string(),
            remark: None,
        })
        .await;
    assert_matches!(result, Err(ServiceError::Conflict(_)));
}

#[tokio::test]
async fn deleting_a_breed_removes_its_cats() {
    let app = common::TestApp::new().await;
    let db = &*app.state.db;
    let persian = cat_breed::Entity::find()
        .filter(cat_breed::Column::BreedName.eq("波斯猫"))
        .one(db)
        .await
        .unwrap()
        .unwrap();

    app.state.services.breeds.delete(persian.id).await.unwrap();

    let remaining = cat_info::Entity::find()
        .filter(cat_info::Column::CatBreedId.eq(persian.id))
        .count(db)
        .await
        .unwrap();
    assert_eq!(remaining, 0);
    assert_eq!(cat_info::Entity::find().count(db).await.unwrap(), 3);
}

#[tokio::test]
async fn deleting_an_order_removes_items_and_keeps_commodities() {
    let app = common::TestApp::new().await;
    let orders = &app.state.services.commodity_orders;
    let order = orders.create(sale(vec![line(1, 2), line(3, 5)])).await.unwrap();
    assert_eq!(order.items.len(), 2);

    orders.delete(order.order.order_id).await.unwrap();

    let db = &*app.state.db;
    assert_eq!(order_item::Entity::find().count(db).await.unwrap(), 0);
    assert_eq!(commodity::Entity::find().count(db).await.unwrap(), 10);
    assert_matches!(
        orders.get(order.order.order_id).await,
        Err(ServiceError::NotFound(_))
    );
}

#[tokio::test]
async fn item_ids_are_unique_across_both_order_kinds() {
    let app = common::TestApp::new().await;
    let services = &app.state.services;
    for _ in 0..3 {
        services
            .commodity_orders
            .create(sale(vec![line(1, 1), line(2, 1)]))
            .await
            .unwrap();
        services
            .purchase_orders
            .create(restock(vec![line(1, 10), line(2, 10)]))
            .await
            .unwrap();
    }

    let db = &*app.state.db;
    let mut ids: Vec<_> = order_item::Entity::find()
        .all(db)
        .await
        .unwrap()
        .into_iter()
        .map(|item| item.item_id)
        .collect();
    ids.extend(
        purchase_order_item::Entity::find()
            .all(db)
            .await
            .unwrap()
            .into_iter()
            .map(|item| item.item_id),
    );
    assert_eq!(ids.len(), 12);
    assert_eq!(ids.iter().collect::<HashSet<_>>().len(), 12);
}

#[tokio::test]
async fn orders_are_written_whole_or_not_at_all() {
    let app = common::TestApp::new().await;
    let result = app
        .state
        .services
        .commodity_orders
        .create(sale(vec![line(1, 1), line(999, 1)]))
        .await;

    assert_matches!(result, Err(ServiceError::InvalidFields(fields)) => {
        assert_eq!(fields["items"], vec!["Item 2: commodity 999 does not exist"]);
    });
    let db = &*app.state.db;
    assert_eq!(order_item::Entity::find().count(db).await.unwrap(), 0);
}

#[tokio::test]
async fn referenced_commodities_cannot_be_deleted() {
    let app = common::TestApp::new().await;
    app.state
        .services
        .purchase_orders
        .create(restock(vec![line(4, 6)]))
        .await
        .unwrap();

    assert_matches!(
        app.state.services.commodities.delete(4).await,
        Err(ServiceError::Conflict(_))
    );

    // the foreign key refuses it as well
    let direct = commodity::Entity::delete_by_id(4)
        .exec(&*app.state.db)
        .await
        .map_err(ServiceError::from);
    assert_matches!(direct, Err(ServiceError::Conflict(_)));

    app.state.services.commodities.delete(10).await.unwrap();
}

#[tokio::test]
async fn future_birthdays_are_refused_at_every_layer() {
    let app = common::TestApp::new().await;
    let tomorrow = Local::now().date_naive() + Duration::days(1);

    let via_service = app
        .state
        .services
        .cats
        .create(CatInput {
            name: "未来猫".to_string(),
            gender: false,
            cat_breed_id: 1,
            birthday: tomorrow,
            cat_state: CatState::ForSale,
        })
        .await;
    assert_matches!(via_service, Err(ServiceError::InvalidFields(fields)) if fields.contains_key("birthday"));

    let via_entity = cat_info::ActiveModel {
        name: Set("未来猫".to_string()),
        gender: Set(false),
        cat_breed_id: Set(1),
        birthday: Set(tomorrow),
        cat_state: Set(CatState::ForSale),
        ..Default::default()
    }
    .insert(&*app.state.db)
    .await
    .map_err(ServiceError::from);
    assert_matches!(via_entity, Err(ServiceError::ValidationError(_)));

    let today = app
        .state
        .services
        .cats
        .create(CatInput {
            name: "今天猫".to_string(),
            gender: true,
            cat_breed_id: 1,
            birthday: Local::now().date_naive(),
            cat_state: CatState::ForSale,
        })
        .await;
    assert!(today.is_ok());
}

#[tokio::test]
async fn cats_must_reference_an_existing_breed() {
    let app = common::TestApp::new().await;
    let result = app
        .state
        .services
        .cats
        .create(CatInput {
            name: "流浪猫".to_string(),
            gender: false,
            cat_breed_id: 42,
            birthday: NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
            cat_state: CatState::ForSale,
        })
        .await;
    assert_matches!(result, Err(ServiceError::InvalidFields(fields)) if fields.contains_key("cat_breed_id"));
}

#[tokio::test]
async fn unknown_stored_codes_are_not_coerced() {
    let app = common::TestApp::new().await;
    app.state
        .db
        .execute_unprepared(
            "INSERT INTO commodity (brand, commodity_type, name, quantity_in_stock, unit) \
             VALUES ('未知', 9, '神秘商品', 1, '个')",
        )
        .await
        .unwrap();

    let read = commodity::Entity::find()
        .filter(commodity::Column::Name.eq("神秘商品"))
        .one(&*app.state.db)
        .await;
    assert!(read.is_err());
}
