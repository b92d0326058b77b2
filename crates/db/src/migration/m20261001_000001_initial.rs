//! Initial database migration.
//!
//! Creates enums, master data, the ledger tables, attachments, notifications
//! and the document counter table.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        // ============================================================
        // PART 1: ENUMS
        // ============================================================
        db.execute_unprepared(ENUMS_SQL).await?;

        // ============================================================
        // PART 2: USERS & PROJECTS
        // ============================================================
        db.execute_unprepared(USERS_SQL).await?;
        db.execute_unprepared(PROJECTS_SQL).await?;

        // ============================================================
        // PART 3: MASTER DATA
        // ============================================================
        db.execute_unprepared(MASTER_DATA_SQL).await?;

        // ============================================================
        // PART 4: LEDGER
        // ============================================================
        db.execute_unprepared(INVOICES_SQL).await?;
        db.execute_unprepared(REIMBURSEMENTS_SQL).await?;
        db.execute_unprepared(DOCUMENT_COUNTERS_SQL).await?;

        // ============================================================
        // PART 5: FILES & NOTIFICATIONS
        // ============================================================
        db.execute_unprepared(FILES_SQL).await?;
        db.execute_unprepared(NOTIFICATIONS_SQL).await?;

        // ============================================================
        // PART 6: TRIGGERS
        // ============================================================
        db.execute_unprepared(TRIGGERS_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_ALL_SQL).await?;
        Ok(())
    }
}

// ============================================================
// SQL CONSTANTS
// ============================================================

const ENUMS_SQL: &str = r"
CREATE TYPE user_role AS ENUM ('ADMIN', 'FINANCE', 'PROJECTMANAGER', 'EMPLOYEES');

CREATE TYPE project_status AS ENUM (
    'PLANNING',
    'ACTIVE',
    'ON_HOLD',
    'COMPLETED',
    'CANCELLED'
);

CREATE TYPE category_type AS ENUM ('INCOME', 'EXPENSE');

CREATE TYPE invoice_type AS ENUM ('INCOME', 'EXPENSE');

CREATE TYPE invoice_status AS ENUM ('UNPAID', 'PAID', 'DEBT');

CREATE TYPE reimbursement_status AS ENUM ('PENDING', 'APPROVED', 'REJECTED', 'PAID');

CREATE TYPE notification_type AS ENUM (
    'REIMBURSEMENT_APPROVED',
    'REIMBURSEMENT_REJECTED',
    'REIMBURSEMENT_PAID',
    'GENERAL'
);
";

const USERS_SQL: &str = r"
CREATE TABLE users (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    email VARCHAR(255) NOT NULL UNIQUE,
    name VARCHAR(200) NOT NULL,
    role user_role NOT NULL DEFAULT 'EMPLOYEES',
    is_active BOOLEAN NOT NULL DEFAULT true,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
);
";

const PROJECTS_SQL: &str = r"
CREATE TABLE projects (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    name VARCHAR(200) NOT NULL,
    client_name VARCHAR(200),
    description TEXT,
    contract_value NUMERIC(19, 4) CHECK (contract_value IS NULL OR contract_value >= 0),
    status project_status NOT NULL DEFAULT 'PLANNING',
    start_date DATE,
    end_date DATE,
    created_by_id UUID NOT NULL REFERENCES users(id),
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

-- PROJECTMANAGER visibility
CREATE INDEX idx_projects_created_by ON projects(created_by_id);

CREATE TABLE project_members (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    project_id UUID NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
    user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    role VARCHAR(50) NOT NULL DEFAULT 'member',
    joined_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT uq_project_member UNIQUE (project_id, user_id)
);

-- EMPLOYEES visibility
CREATE INDEX idx_project_members_user ON project_members(user_id);
";

const MASTER_DATA_SQL: &str = r"
CREATE TABLE categories (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    name VARCHAR(100) NOT NULL,
    type category_type NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE TABLE taxes (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    name VARCHAR(100) NOT NULL,
    percentage NUMERIC(5, 2) NOT NULL CHECK (percentage BETWEEN 0 AND 100),
    is_active BOOLEAN NOT NULL DEFAULT true,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE TABLE vendors (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    name VARCHAR(200) NOT NULL,
    location VARCHAR(500) NOT NULL,
    contact_person VARCHAR(200),
    phone VARCHAR(50),
    email VARCHAR(255),
    category_id UUID NOT NULL REFERENCES categories(id),
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
);
";

const INVOICES_SQL: &str = r"
CREATE TABLE invoices (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    invoice_number VARCHAR(32) NOT NULL,
    type invoice_type NOT NULL,
    status invoice_status NOT NULL DEFAULT 'UNPAID',
    amount NUMERIC(19, 4) NOT NULL CHECK (amount >= 0),
    tax_amount NUMERIC(19, 4) NOT NULL DEFAULT 0,
    total_amount NUMERIC(19, 4) NOT NULL,
    project_id UUID REFERENCES projects(id) ON DELETE SET NULL,
    vendor_id UUID REFERENCES vendors(id) ON DELETE SET NULL,
    category_id UUID NOT NULL REFERENCES categories(id),
    tax_id UUID REFERENCES taxes(id) ON DELETE SET NULL,
    due_date TIMESTAMPTZ,
    paid_at TIMESTAMPTZ,
    notes TEXT,
    created_by_id UUID NOT NULL REFERENCES users(id),
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),

    CONSTRAINT chk_invoice_total CHECK (total_amount = amount + tax_amount),
    CONSTRAINT chk_invoice_paid_at CHECK ((status = 'PAID') = (paid_at IS NOT NULL))
);

-- Final backstop against duplicate numbers
CREATE UNIQUE INDEX uq_invoices_number ON invoices(invoice_number);

CREATE INDEX idx_invoices_project ON invoices(project_id);
CREATE INDEX idx_invoices_status ON invoices(status, type);
CREATE INDEX idx_invoices_created ON invoices(created_at DESC);
";

const REIMBURSEMENTS_SQL: &str = r"
CREATE TABLE reimbursements (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    title VARCHAR(200) NOT NULL,
    description TEXT,
    amount NUMERIC(19, 4) NOT NULL CHECK (amount >= 0),
    category_id UUID NOT NULL REFERENCES categories(id),
    project_id UUID REFERENCES projects(id) ON DELETE SET NULL,
    status reimbursement_status NOT NULL DEFAULT 'PENDING',
    submitted_by_id UUID NOT NULL REFERENCES users(id),
    approved_by_id UUID REFERENCES users(id),
    rejection_reason TEXT,
    submitted_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    approved_at TIMESTAMPTZ,
    paid_at TIMESTAMPTZ,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),

    CONSTRAINT chk_rejection_reason CHECK (
        (status = 'REJECTED') = (rejection_reason IS NOT NULL AND length(trim(rejection_reason)) > 0)
    ),
    CONSTRAINT chk_reimbursement_paid_at CHECK ((status = 'PAID') = (paid_at IS NOT NULL))
);

CREATE INDEX idx_reimbursements_submitter ON reimbursements(submitted_by_id, created_at DESC);
CREATE INDEX idx_reimbursements_status ON reimbursements(status);
";

const DOCUMENT_COUNTERS_SQL: &str = r"
-- Serialization point for document numbering: one row per prefix and period.
CREATE TABLE document_counters (
    prefix VARCHAR(8) NOT NULL,
    period CHAR(6) NOT NULL,
    last_value INTEGER NOT NULL CHECK (last_value > 0),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    PRIMARY KEY (prefix, period)
);
";

const FILES_SQL: &str = r"
CREATE TABLE files (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    storage_key VARCHAR(500) NOT NULL UNIQUE,
    url TEXT NOT NULL,
    original_name VARCHAR(255) NOT NULL,
    mime_type VARCHAR(100) NOT NULL,
    size BIGINT NOT NULL CHECK (size >= 0),
    provider VARCHAR(20) NOT NULL,
    uploaded_by_id UUID NOT NULL REFERENCES users(id),
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE TABLE invoice_attachments (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    invoice_id UUID NOT NULL REFERENCES invoices(id) ON DELETE CASCADE,
    file_id UUID NOT NULL REFERENCES files(id) ON DELETE CASCADE,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT uq_invoice_attachment UNIQUE (invoice_id, file_id)
);

CREATE TABLE reimbursement_attachments (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    reimbursement_id UUID NOT NULL REFERENCES reimbursements(id) ON DELETE CASCADE,
    file_id UUID NOT NULL REFERENCES files(id) ON DELETE CASCADE,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT uq_reimbursement_attachment UNIQUE (reimbursement_id, file_id)
);
";

const NOTIFICATIONS_SQL: &str = r"
CREATE TABLE notifications (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    type notification_type NOT NULL DEFAULT 'GENERAL',
    title VARCHAR(200) NOT NULL,
    message TEXT NOT NULL,
    reference_id UUID,
    reference_type VARCHAR(50),
    is_read BOOLEAN NOT NULL DEFAULT false,
    email_sent BOOLEAN NOT NULL DEFAULT false,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX idx_notifications_user ON notifications(user_id, created_at DESC);
CREATE INDEX idx_notifications_unread ON notifications(user_id) WHERE is_read = false;
";

const TRIGGERS_SQL: &str = r"
-- ============================================================
-- FUNCTION: guard_reimbursement_terminal
-- Rejected and paid claims never change status again.
-- ============================================================
CREATE OR REPLACE FUNCTION guard_reimbursement_terminal()
RETURNS TRIGGER AS $$
BEGIN
    IF OLD.status IN ('REJECTED', 'PAID') AND NEW.status <> OLD.status THEN
        RAISE EXCEPTION 'reimbursement % is % and cannot move to %',
            OLD.id, OLD.status, NEW.status;
    END IF;
    RETURN NEW;
END;
$$ LANGUAGE plpgsql;

CREATE TRIGGER trg_guard_reimbursement_terminal
BEFORE UPDATE OF status ON reimbursements
FOR EACH ROW
EXECUTE FUNCTION guard_reimbursement_terminal();
";

const DROP_ALL_SQL: &str = r"
DROP TRIGGER IF EXISTS trg_guard_reimbursement_terminal ON reimbursements;
DROP FUNCTION IF EXISTS guard_reimbursement_terminal();

DROP TABLE IF EXISTS notifications CASCADE;
DROP TABLE IF EXISTS reimbursement_attachments CASCADE;
DROP TABLE IF EXISTS invoice_attachments CASCADE;
DROP TABLE IF EXISTS files CASCADE;
DROP TABLE IF EXISTS document_counters CASCADE;
DROP TABLE IF EXISTS reimbursements CASCADE;
DROP TABLE IF EXISTS invoices CASCADE;
DROP TABLE IF EXISTS vendors CASCADE;
DROP TABLE IF EXISTS taxes CASCADE;
DROP TABLE IF EXISTS categories CASCADE;
DROP TABLE IF EXISTS project_members CASCADE;
DROP TABLE IF EXISTS projects CASCADE;
DROP TABLE IF EXISTS users CASCADE;

DROP TYPE IF EXISTS notification_type;
DROP TYPE IF EXISTS reimbursement_status;
DROP TYPE IF EXISTS invoice_status;
DROP TYPE IF EXISTS invoice_type;
DROP TYPE IF EXISTS category_type;
DROP TYPE IF EXISTS project_status;
DROP TYPE IF EXISTS user_role;
";
