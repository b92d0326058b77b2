//! Database seeder for Opsledger development and testing.
//!
//! Seeds master data, one user per role plus staff, projects with members,
//! tasks and teams, twelve months of invoices and reimbursement claims in
//! every state. All
//! writes go through the repositories, so numbering, totals and contract
//! ceilings follow the same rules as the API.
//!
//! Amounts are derived from loop indexes; two runs against empty databases
//! produce the same figures. The seeder refuses to run when users exist.
//!
//! Usage: cargo run --bin seeder

use std::collections::HashMap;

use anyhow::{Context, bail};
use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::DatabaseConnection;
use uuid::Uuid;

use opsledger_core::access::{Principal, Role};
use opsledger_core::invoice::{InvoiceStatus, InvoiceType};
use opsledger_core::task::{TaskPriority, TaskStatus};
use opsledger_core::totals::{cap_to_headroom, compute_totals, contract_headroom};
use opsledger_db::entities::{
    categories, projects,
    sea_orm_active_enums::{CategoryType, ProjectStatus},
    taxes, users, vendors,
};
use opsledger_db::repositories::{
    CategoryInput, CreateInvoiceInput, CreateProjectInput, CreateReimbursementInput,
    CreateTaskInput, TaxInput, VendorInput,
};
use opsledger_db::{
    CatalogRepository, InvoiceRepository, NotificationRepository, ProjectRepository,
    ReimbursementRepository, TaskRepository, TeamRepository, UserRepository, connect_with,
};
use opsledger_shared::{AppConfig, JwtConfig, JwtService};

/// Number of staff accounts.
const STAFF_COUNT: usize = 10;
/// Months of invoice history.
const HISTORY_MONTHS: u32 = 12;
/// Number of reimbursement claims.
const CLAIM_COUNT: usize = 24;
/// Tasks per project.
const TASKS_PER_PROJECT: usize = 4;

struct Catalog {
    income: Vec<categories::Model>,
    expense: Vec<categories::Model>,
    vat: taxes::Model,
    vendors: Vec<vendors::Model>,
}

struct People {
    admin: users::Model,
    finance: users::Model,
    managers: Vec<users::Model>,
    staff: Vec<users::Model>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("failed to load configuration")?;

    println!("Connecting to database...");
    let db = connect_with(&config.database)
        .await
        .context("failed to connect to database")?;

    if UserRepository::new(db.clone()).count().await? > 0 {
        bail!("database already has users; run `migrator fresh` first");
    }

    let now = Utc::now();

    println!("Seeding master data...");
    let catalog = seed_catalog(&db, now).await?;

    println!("Seeding users...");
    let people = seed_users(&db, now).await?;

    println!("Seeding projects...");
    let projects = seed_projects(&db, &people, now).await?;

    println!("Seeding tasks and teams...");
    seed_work(&db, &people, &projects, now).await?;

    println!("Seeding invoices...");
    seed_invoices(&db, &catalog, &people, &projects, now).await?;

    println!("Seeding reimbursements...");
    seed_reimbursements(&db, &catalog, &people, &projects, now).await?;

    print_tokens(&config, &people)?;
    println!("Seeding complete!");
    Ok(())
}

async fn seed_catalog(db: &DatabaseConnection, now: DateTime<Utc>) -> anyhow::Result<Catalog> {
    let repo = CatalogRepository::new(db.clone());

    let mut income = Vec::new();
    for name in ["Project Revenue", "Maintenance Fee", "Consulting"] {
        let input = CategoryInput {
            name: name.to_string(),
            category_type: CategoryType::Income,
        };
        income.push(repo.create_category(input, now).await?);
    }

    let mut expense = Vec::new();
    for name in [
        "Marketing",
        "Office Supplies",
        "IT Infrastructure",
        "Travel",
        "Operational",
        "Salary",
    ] {
        let input = CategoryInput {
            name: name.to_string(),
            category_type: CategoryType::Expense,
        };
        expense.push(repo.create_category(input, now).await?);
    }

    let mut vat = None;
    for (name, percentage) in [("PPN 11%", dec!(11)), ("PPh 23 (2%)", dec!(2)), ("None", dec!(0))] {
        let tax = repo
            .create_tax(
                TaxInput {
                    name: name.to_string(),
                    percentage,
                    is_active: true,
                },
                now,
            )
            .await?;
        if vat.is_none() {
            vat = Some(tax);
        }
    }
    let vat = vat.context("no tax seeded")?;

    let mut vendors = Vec::new();
    for (i, name) in [
        "GCP",
        "Azure",
        "Office Stationery",
        "Local Travel Co",
        "Internet Provider",
        "Cleaning Pro",
    ]
    .into_iter()
    .enumerate()
    {
        let input = VendorInput {
            name: name.to_string(),
            location: "Jakarta".to_string(),
            contact_person: None,
            phone: None,
            email: None,
            category_id: expense[i % expense.len()].id,
        };
        vendors.push(repo.create_vendor(input, now).await?);
    }

    Ok(Catalog {
        income,
        expense,
        vat,
        vendors,
    })
}

async fn seed_users(db: &DatabaseConnection, now: DateTime<Utc>) -> anyhow::Result<People> {
    let repo = UserRepository::new(db.clone());

    let admin = repo
        .create("admin@opsledger.dev", "Super Admin", Role::Admin, now)
        .await?;
    let finance = repo
        .create("finance@opsledger.dev", "Finance Officer", Role::Finance, now)
        .await?;
    let managers = vec![
        repo.create("pm.a@opsledger.dev", "Project Manager A", Role::ProjectManager, now)
            .await?,
        repo.create("pm.b@opsledger.dev", "Project Manager B", Role::ProjectManager, now)
            .await?,
    ];

    let mut staff = Vec::with_capacity(STAFF_COUNT);
    for i in 1..=STAFF_COUNT {
        staff.push(
            repo.create(
                &format!("staff{i}@opsledger.dev"),
                &format!("Staff {i}"),
                Role::Employees,
                now,
            )
            .await?,
        );
    }

    Ok(People {
        admin,
        finance,
        managers,
        staff,
    })
}

/// First day of the month `back` months before `now`.
fn month_start(now: DateTime<Utc>, back: u32) -> NaiveDate {
    let date = now.date_naive();
    date.checked_sub_months(Months::new(back))
        .and_then(|d| d.with_day(1))
        .unwrap_or(date)
}

/// First day of the month `ahead` months after `now`.
fn month_ahead(now: DateTime<Utc>, ahead: u32) -> NaiveDate {
    let date = now.date_naive();
    date.checked_add_months(Months::new(ahead))
        .and_then(|d| d.with_day(1))
        .unwrap_or(date)
}

async fn seed_projects(
    db: &DatabaseConnection,
    people: &People,
    now: DateTime<Utc>,
) -> anyhow::Result<Vec<projects::Model>> {
    let repo = ProjectRepository::new(db.clone());

    // (name, months back, months ahead, contract value, status, owner)
    let plan = [
        ("Core Banking Integration", 8, 2, dec!(750000000), ProjectStatus::Active, &people.managers[0]),
        ("Mobile App Revamp", 4, 4, dec!(450000000), ProjectStatus::Active, &people.managers[0]),
        ("Security Audit Q1", 10, 0, dec!(200000000), ProjectStatus::Completed, &people.managers[1]),
        ("Cloud Migration Phase 2", 1, 11, dec!(1200000000), ProjectStatus::Planning, &people.admin),
        ("HR System Implementation", 6, 1, dec!(300000000), ProjectStatus::OnHold, &people.admin),
    ];

    let mut created = Vec::with_capacity(plan.len());
    for (index, (name, back, ahead, value, status, owner)) in plan.into_iter().enumerate() {
        let input = CreateProjectInput {
            name: name.to_string(),
            client_name: Some("Global Enterprise Ltd".to_string()),
            description: None,
            contract_value: Some(value),
            status: Some(status),
            start_date: Some(month_start(now, back)),
            end_date: Some(if ahead == 0 {
                month_start(now, 1)
            } else {
                month_ahead(now, ahead)
            }),
        };
        let project = repo.create(owner.id, input, now).await?;

        let principal = Principal::new(owner.id, role_of(owner, people));
        for offset in 0..3 {
            let member = &people.staff[(index * 2 + offset) % people.staff.len()];
            repo.add_member(&principal, project.id, member.id, None, now)
                .await?;
        }
        created.push(project);
    }

    Ok(created)
}

fn role_of(user: &users::Model, people: &People) -> Role {
    if user.id == people.admin.id {
        Role::Admin
    } else {
        Role::ProjectManager
    }
}

async fn seed_work(
    db: &DatabaseConnection,
    people: &People,
    projects: &[projects::Model],
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    let tasks = TaskRepository::new(db.clone());
    let statuses = TaskStatus::ALL;
    let priorities = [
        TaskPriority::Low,
        TaskPriority::Medium,
        TaskPriority::High,
        TaskPriority::Urgent,
    ];

    for (index, project) in projects.iter().enumerate() {
        let owner = [&people.admin, &people.managers[0], &people.managers[1]]
            .into_iter()
            .find(|u| u.id == project.created_by_id)
            .context("project owner not seeded")?;
        let principal = Principal::new(owner.id, role_of(owner, people));

        for n in 0..TASKS_PER_PROJECT {
            // Assignees are the project's seeded members.
            let assignee = &people.staff[(index * 2 + n % 3) % people.staff.len()];
            let days = i64::try_from(n * 7 + index)?;
            let input = CreateTaskInput {
                title: format!("{} task {}", project.name, n + 1),
                description: None,
                priority: Some(priorities[(index + n) % priorities.len()]),
                status: Some(statuses[(index + n) % statuses.len()]),
                assigned_to: assignee.id,
                deadline: now + Duration::days(days),
            };
            tasks.create(&principal, project.id, input, now).await?;
        }
    }

    let teams = TeamRepository::new(db.clone());
    for (index, name) in ["Engineering", "Finance Ops", "Delivery"].into_iter().enumerate() {
        let team = teams.create(name.to_string(), None, now).await?;
        for member in people.staff.iter().skip(index * 3).take(3) {
            teams.add_member(team.id, member.id, now).await?;
        }
    }

    Ok(())
}

/// Mid-month timestamp `back` months before `now`.
fn mid_month(now: DateTime<Utc>, back: u32) -> DateTime<Utc> {
    now.checked_sub_months(Months::new(back))
        .and_then(|d| d.with_day(15))
        .unwrap_or(now)
}

async fn seed_invoices(
    db: &DatabaseConnection,
    catalog: &Catalog,
    people: &People,
    projects: &[projects::Model],
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    let repo = InvoiceRepository::new(db.clone());
    let vat_rate = catalog.vat.percentage;
    let mut invoiced: HashMap<Uuid, Decimal> = HashMap::new();
    let mut count = 0_usize;

    for back in 0..HISTORY_MONTHS {
        let at = mid_month(now, back);
        let step = Decimal::from(back);

        for i in 0..3_u32 {
            let eligible: Vec<&projects::Model> = projects
                .iter()
                .filter(|p| {
                    p.start_date.is_some_and(|start| at.date_naive() >= start)
                        && matches!(p.status, ProjectStatus::Active | ProjectStatus::Completed)
                })
                .collect();
            // Every third income invoice is not tied to a project.
            let project = (i != 2 && !eligible.is_empty())
                .then(|| eligible[(back as usize + i as usize) % eligible.len()]);

            let mut amount = dec!(25000000) + step * dec!(2500000) + Decimal::from(i) * dec!(7000000);
            if let Some(project) = project {
                let used = invoiced.get(&project.id).copied().unwrap_or_default();
                let headroom = contract_headroom(project.contract_value.unwrap_or_default(), used);
                let Some(capped) = cap_to_headroom(amount, Some(vat_rate), headroom) else {
                    continue;
                };
                amount = capped;
                *invoiced.entry(project.id).or_default() +=
                    compute_totals(amount, Some(vat_rate)).total_amount;
            }

            let status = if (back + i) % 7 == 3 {
                InvoiceStatus::Unpaid
            } else {
                InvoiceStatus::Paid
            };
            let input = CreateInvoiceInput {
                invoice_type: InvoiceType::Income,
                project_id: project.map(|p| p.id),
                vendor_id: None,
                category_id: catalog.income[i as usize % catalog.income.len()].id,
                tax_id: Some(catalog.vat.id),
                amount,
                status: Some(status),
                due_date: Some(at + chrono::Duration::days(30)),
                notes: None,
            };
            repo.create(people.finance.id, input, at).await?;
            count += 1;
        }

        for i in 0..4_u32 {
            let slot = back as usize + i as usize;
            let project = (i % 2 == 0)
                .then(|| &projects[slot % projects.len()])
                .filter(|p| p.status != ProjectStatus::Completed);
            let status = match (back + i) % 5 {
                0 => InvoiceStatus::Debt,
                1 => InvoiceStatus::Unpaid,
                _ => InvoiceStatus::Paid,
            };
            let input = CreateInvoiceInput {
                invoice_type: InvoiceType::Expense,
                project_id: project.map(|p| p.id),
                vendor_id: Some(catalog.vendors[slot % catalog.vendors.len()].id),
                category_id: catalog.expense[i as usize % catalog.expense.len()].id,
                tax_id: Some(catalog.vat.id),
                amount: dec!(2000000) + Decimal::from(slot) * dec!(650000),
                status: Some(status),
                due_date: Some(at + chrono::Duration::days(14)),
                notes: None,
            };
            repo.create(people.finance.id, input, at).await?;
            count += 1;
        }
    }

    println!("  {count} invoices");
    Ok(())
}

async fn seed_reimbursements(
    db: &DatabaseConnection,
    catalog: &Catalog,
    people: &People,
    projects: &[projects::Model],
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    let repo = ReimbursementRepository::new(db.clone());
    let inbox = NotificationRepository::new(db.clone());

    for i in 0..CLAIM_COUNT {
        let at = mid_month(now, u32::try_from(i % 10).unwrap_or(0));
        let category = &catalog.expense[i % catalog.expense.len()];
        let submitter = &people.staff[i % people.staff.len()];
        let input = CreateReimbursementInput {
            title: format!("{} - Claim {}", category.name, i + 1),
            description: None,
            amount: dec!(50000) + Decimal::from(i) * dec!(41250),
            category_id: category.id,
            project_id: (i % 3 != 0).then(|| projects[i % projects.len()].id),
        };
        let claim = repo.create(submitter.id, input, at).await?;

        // Cycle through PENDING, APPROVED, REJECTED and PAID.
        let notices = match i % 4 {
            1 => vec![repo.approve(claim.id, people.finance.id, at).await?.notice],
            2 => vec![
                repo.reject(claim.id, people.finance.id, "Receipt is missing", at)
                    .await?
                    .notice,
            ],
            3 => vec![
                repo.approve(claim.id, people.finance.id, at).await?.notice,
                repo.mark_paid(claim.id, at).await?.notice,
            ],
            _ => Vec::new(),
        };
        for notice in &notices {
            inbox.create(notice, at).await?;
        }
    }

    println!("  {CLAIM_COUNT} reimbursements");
    Ok(())
}

fn print_tokens(config: &AppConfig, people: &People) -> anyhow::Result<()> {
    let jwt = JwtService::new(JwtConfig::from(&config.jwt));

    println!("Access tokens:");
    for (user, role) in [
        (&people.admin, Role::Admin),
        (&people.finance, Role::Finance),
        (&people.managers[0], Role::ProjectManager),
        (&people.staff[0], Role::Employees),
    ] {
        let token = jwt.generate_access_token(user.id, role.as_str())?;
        println!("  {role:<14} {}  {token}", user.email);
    }
    Ok(())
}
