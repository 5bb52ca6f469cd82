//! Demonstration data written on first start.
//!
//! Each table is filled only while it is empty, so both passes can run on every start.

use std::collections::HashMap;

use chrono::NaiveDate;
use metrics::counter;
use sea_orm::{
    ActiveModelTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait, Set,
    TransactionTrait,
};
use sea_orm_migration::SchemaManager;
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::auth::{IdentityResult, IdentityStore, NewUser};
use crate::entities::{appointment, cat_breed, cat_info, commodity, CatState, CommodityType};
use crate::errors::ServiceError;
use crate::validation::display::{ADMIN_ROLE, SALESMAN_ROLE};

const BUSINESS_TABLES: [&str; 4] = ["cat_breed", "cat_info", "commodity", "appointment"];
const IDENTITY_TABLES: [&str; 3] = ["users", "roles", "user_roles"];
const SEED_PASSWORD: &str = "Aa.123456";

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("required table `{0}` does not exist; apply the migrations first")]
    MissingTable(&'static str),

    #[error("breed `{0}` needed by the seed cats does not exist")]
    MissingBreed(String),

    #[error("seed database error: {0}")]
    Database(#[from] DbErr),

    #[error("seed identity error: {0}")]
    Identity(#[from] ServiceError),
}

impl From<SeedError> for ServiceError {
    fn from(err: SeedError) -> Self {
        match err {
            SeedError::MissingTable(_) | SeedError::MissingBreed(_) => {
                ServiceError::Configuration(err.to_string())
            }
            SeedError::Database(e) => e.into(),
            SeedError::Identity(e) => e,
        }
    }
}

/// Tables a seed pass wrote to.
#[derive(Debug, Default, Clone, PartialEq, Eq, serde::Serialize)]
pub struct SeedReport {
    pub seeded: Vec<&'static str>,
}

impl SeedReport {
    pub fn changed(&self) -> bool {
        !self.seeded.is_empty()
    }

    fn record(&mut self, table: &'static str, rows: usize) {
        counter!("catstore_seed.rows_inserted", rows as u64, "table" => table);
        info!(table, rows, "seeded");
        self.seeded.push(table);
    }
}

struct SeedBreed {
    name: &'static str,
    remark: &'static str,
}

const BREEDS: [SeedBreed; 6] = [
    SeedBreed { name: "布偶猫", remark: "性格温顺，粘人，适合家庭饲养" },
    SeedBreed { name: "美国短毛猫", remark: "体格健壮，适应力强" },
    SeedBreed { name: "中国狸花猫", remark: "本土品种，聪明独立" },
    SeedBreed { name: "英国短毛猫", remark: "圆脸短毛，性格安静" },
    SeedBreed { name: "波斯猫", remark: "长毛，需要经常打理" },
    SeedBreed { name: "缅因猫", remark: "体型大，被称为温柔的巨人" },
];

struct SeedCat {
    name: &'static str,
    gender: bool,
    breed: &'static str,
    birthday: (i32, u32, u32),
    state: CatState,
}

const CATS: [SeedCat; 5] = [
    SeedCat { name: "小白", gender: true, breed: "布偶猫", birthday: (2022, 4, 12), state: CatState::ForSale },
    SeedCat { name: "小花", gender: true, breed: "中国狸花猫", birthday: (2025, 2, 12), state: CatState::ForSale },
    SeedCat { name: "球球", gender: false, breed: "缅因猫", birthday: (2022, 10, 6), state: CatState::Sold },
    SeedCat { name: "香子兰", gender: true, breed: "波斯猫", birthday: (2024, 3, 2), state: CatState::ForSale },
    SeedCat { name: "巧克力", gender: true, breed: "波斯猫", birthday: (2022, 5, 1), state: CatState::Sold },
];

struct SeedCommodity {
    brand: &'static str,
    kind: CommodityType,
    name: &'static str,
    quantity: i32,
    unit: &'static str,
}

const COMMODITIES: [SeedCommodity; 10] = [
    SeedCommodity { brand: "皇家 (Royal Canin)", kind: CommodityType::CatFood, name: "皇家室内成猫粮", quantity: 50, unit: "袋" },
    SeedCommodity { brand: "希尔斯 (Hill's)", kind: CommodityType::CatFood, name: "希尔斯科学配方幼猫粮", quantity: 30, unit: "袋" },
    SeedCommodity { brand: "喵达 (Meow Mix)", kind: CommodityType::CatSnack, name: "喵达三文鱼味猫条", quantity: 100, unit: "包" },
    SeedCommodity { brand: "宠确幸 (Pet House)", kind: CommodityType::CatToy, name: "宠确幸逗猫棒", quantity: 20, unit: "个" },
    SeedCommodity { brand: "福来恩 (Frontline)", kind: CommodityType::CatMedicine, name: "福来恩体外驱虫滴剂", quantity: 15, unit: "盒" },
    SeedCommodity { brand: "渴望 (Orijen)", kind: CommodityType::CatFood, name: "渴望六种鱼全猫粮", quantity: 25, unit: "袋" },
    SeedCommodity { brand: "猫乐适 (Catit)", kind: CommodityType::CatToy, name: "猫乐适电动逗猫球", quantity: 12, unit: "个" },
    SeedCommodity { brand: "绿十字 (Vet's Best)", kind: CommodityType::CatMedicine, name: "绿十字猫草片", quantity: 40, unit: "瓶" },
    SeedCommodity { brand: "顽皮 (Wanpy)", kind: CommodityType::CatSnack, name: "顽皮鸡肉味猫饼干", quantity: 80, unit: "罐" },
    SeedCommodity { brand: "小佩 (PETKIT)", kind: CommodityType::CatToy, name: "小佩智能饮水机", quantity: 10, unit: "台" },
];

struct SeedAppointment {
    customer_name: &'static str,
    arrival: (i32, u32, u32, u32, u32),
    remark: Option<&'static str>,
}

const APPOINTMENTS: [SeedAppointment; 4] = [
    SeedAppointment { customer_name: "张女士", arrival: (2025, 5, 10, 10, 0), remark: Some("想看看布偶猫") },
    SeedAppointment { customer_name: "李先生", arrival: (2025, 5, 10, 15, 30), remark: None },
    SeedAppointment { customer_name: "王女士", arrival: (2025, 5, 11, 11, 0), remark: Some("咨询幼猫疫苗和驱虫") },
    SeedAppointment { customer_name: "陈先生", arrival: (2025, 5, 12, 16, 0), remark: Some("购买猫粮和猫砂") },
];

fn date(ymd: (i32, u32, u32)) -> Result<NaiveDate, DbErr> {
    NaiveDate::from_ymd_opt(ymd.0, ymd.1, ymd.2)
        .ok_or_else(|| DbErr::Custom(format!("invalid seed date {ymd:?}")))
}

async fn require_tables(db: &DatabaseConnection, tables: &[&'static str]) -> Result<(), SeedError> {
    let schema = SchemaManager::new(db);
    for &table in tables {
        if !schema.has_table(table).await? {
            return Err(SeedError::MissingTable(table));
        }
    }
    Ok(())
}

/// Seeds breeds, cats, commodities and appointments in one transaction.
///
/// A missing table is fatal and nothing is written. The transaction is committed only when at
/// least one table was filled.
#[instrument(skip(db))]
pub async fn ensure_business_data_seeded(db: &DatabaseConnection) -> Result<SeedReport, SeedError> {
    require_tables(db, &BUSINESS_TABLES).await?;

    let txn = db.begin().await?;
    let mut report = SeedReport::default();

    let mut breed_ids = HashMap::new();
    if cat_breed::Entity::find().count(&txn).await? == 0 {
        for breed in &BREEDS {
            let inserted = cat_breed::ActiveModel {
                breed_name: Set(breed.name.to_string()),
                remark: Set(Some(breed.remark.to_string())),
                ..Default::default()
            }
            .insert(&txn)
            .await?;
            breed_ids.insert(breed.name, inserted.id);
        }
        report.record("cat_breed", BREEDS.len());
    }

    let no_cats = cat_info::Entity::find().count(&txn).await? == 0;
    if no_cats && breed_ids.is_empty() {
        // existing breeds may have been renamed or removed since they were seeded
        warn!(task = "seed cats", "breeds were not seeded in this pass, skipping the seed cats");
    } else if no_cats {
        for cat in &CATS {
            let breed_id = *breed_ids
                .get(cat.breed)
                .ok_or_else(|| SeedError::MissingBreed(cat.breed.to_string()))?;
            cat_info::ActiveModel {
                name: Set(cat.name.to_string()),
                gender: Set(cat.gender),
                cat_breed_id: Set(breed_id),
                birthday: Set(date(cat.birthday)?),
                cat_state: Set(cat.state),
                ..Default::default()
            }
            .insert(&txn)
            .await?;
        }
        report.record("cat_info", CATS.len());
    }

    if commodity::Entity::find().count(&txn).await? == 0 {
        for item in &COMMODITIES {
            commodity::ActiveModel {
                brand: Set(item.brand.to_string()),
                commodity_type: Set(item.kind),
                name: Set(item.name.to_string()),
                quantity_in_stock: Set(item.quantity),
                unit: Set(item.unit.to_string()),
                ..Default::default()
            }
            .insert(&txn)
            .await?;
        }
        report.record("commodity", COMMODITIES.len());
    }

    if appointment::Entity::find().count(&txn).await? == 0 {
        for visit in &APPOINTMENTS {
            let (y, m, d, hh, mm) = visit.arrival;
            let arrival = date((y, m, d))?
                .and_hms_opt(hh, mm, 0)
                .ok_or_else(|| DbErr::Custom(format!("invalid seed time {:?}", visit.arrival)))?;
            appointment::ActiveModel {
                customer_name: Set(visit.customer_name.to_string()),
                arrival_date_time: Set(arrival),
                remark: Set(visit.remark.map(str::to_string)),
                ..Default::default()
            }
            .insert(&txn)
            .await?;
        }
        report.record("appointment", APPOINTMENTS.len());
    }

    if report.changed() {
        txn.commit().await?;
        info!(tables = ?report.seeded, "business data seeded");
    } else {
        txn.rollback().await?;
    }
    Ok(report)
}

struct SeedUser {
    task: &'static str,
    user_name: &'static str,
    nickname: &'static str,
    phone_number: &'static str,
    role: &'static str,
}

const USERS: [SeedUser; 2] = [
    SeedUser { task: "user 1", user_name: "xiaohe", nickname: "小何", phone_number: "13423232323", role: ADMIN_ROLE },
    SeedUser { task: "user 2", user_name: "xiaoshi", nickname: "小石", phone_number: "18923232323", role: SALESMAN_ROLE },
];

/// Seeds the `admin` and `salesman` roles and one account for each.
///
/// Refused identity operations are logged and skipped; only store failures abort the pass.
#[instrument(skip(identity))]
pub async fn ensure_identity_seeded(identity: &IdentityStore) -> Result<SeedReport, SeedError> {
    require_tables(identity.connection(), &IDENTITY_TABLES).await?;
    let mut report = SeedReport::default();

    if identity.count_roles().await? == 0 {
        let mut created = 0;
        for role in [ADMIN_ROLE, SALESMAN_ROLE] {
            let result = identity.create_role(role).await?;
            if check_result(&format!("create role {role}"), &result) {
                created += 1;
            }
        }
        if created > 0 {
            report.record("roles", created);
        }
    }

    if identity.count_users().await? == 0 {
        let mut created = 0;
        for seed in &USERS {
            let new_user = NewUser {
                user_name: seed.user_name.to_string(),
                nickname: Some(seed.nickname.to_string()),
                phone_number: Some(seed.phone_number.to_string()),
                phone_number_confirmed: true,
            };
            let user = match identity.create_user(new_user, SEED_PASSWORD).await? {
                Ok(user) => user,
                Err(result) => {
                    check_result(&format!("create {}", seed.task), &result);
                    continue;
                }
            };
            created += 1;

            let result = identity.add_to_role(user.id, seed.role).await?;
            check_result(&format!("assign role to {}", seed.task), &result);
        }
        if created > 0 {
            report.record("users", created);
        }
    }

    Ok(report)
}

/// Logs every error of a refused seed task. Returns whether the task succeeded.
fn check_result(task: &str, result: &IdentityResult) -> bool {
    for error in &result.errors {
        counter!("catstore_seed.identity_failures", 1);
        warn!(
            task,
            code = %error.code,
            description = %error.description,
            "seed task failed"
        );
    }
    result.succeeded()
}
