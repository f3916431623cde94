//! # Seed Routines
//!
//! Baseline tables and demo rows for each business module, created inside
//! a freshly provisioned schema. Statements are schema-qualified and
//! idempotent so a retried seed pass converges instead of failing.

use sqlx::PgPool;

use crate::errors::PreviewResult;
use crate::record::{Feature, Tier};
use crate::schema_name::SchemaName;
use crate::store::db_error;

/// Run the full seed sequence for a schema
pub async fn seed_schema(
    pool: &PgPool,
    schema: &SchemaName,
    tier: Tier,
    features: &[Feature],
) -> PreviewResult<()> {
    for statement in seed_statements(schema, tier, features) {
        sqlx::raw_sql(&statement)
            .execute(pool)
            .await
            .map_err(db_error)?;
    }
    Ok(())
}

/// Full ordered statement list: meta table first, then per-feature batches
pub fn seed_statements(schema: &SchemaName, tier: Tier, features: &[Feature]) -> Vec<String> {
    let mut statements = meta_statements(schema, tier, features);
    for feature in features {
        statements.extend(feature_statements(schema, *feature));
    }
    statements
}

/// `preview_meta` records what this sandbox was provisioned with
fn meta_statements(schema: &SchemaName, tier: Tier, features: &[Feature]) -> Vec<String> {
    let s = schema.as_str();
    let feature_list: Vec<&str> = features.iter().map(|f| f.as_str()).collect();
    vec![
        format!(
            r#"CREATE TABLE IF NOT EXISTS "{s}".preview_meta (
                key        TEXT PRIMARY KEY,
                value      TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )"#
        ),
        format!(
            "INSERT INTO \"{s}\".preview_meta (key, value) VALUES ('tier', '{tier}') \
             ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value"
        ),
        format!(
            "INSERT INTO \"{s}\".preview_meta (key, value) VALUES ('features', '{}') \
             ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value",
            feature_list.join(",")
        ),
    ]
}

fn feature_statements(schema: &SchemaName, feature: Feature) -> Vec<String> {
    let s = schema.as_str();
    match feature {
        Feature::Ecommerce => vec![
            format!(
                r#"CREATE TABLE IF NOT EXISTS "{s}".products (
                    id          UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                    name        VARCHAR(255) NOT NULL,
                    description TEXT,
                    price_cents INTEGER NOT NULL DEFAULT 0,
                    stock       INTEGER NOT NULL DEFAULT 0,
                    created_at  TIMESTAMPTZ NOT NULL DEFAULT NOW()
                )"#
            ),
            format!(
                r#"CREATE TABLE IF NOT EXISTS "{s}".orders (
                    id          UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                    customer    VARCHAR(255) NOT NULL,
                    total_cents INTEGER NOT NULL DEFAULT 0,
                    status      VARCHAR(32) NOT NULL DEFAULT 'pending',
                    created_at  TIMESTAMPTZ NOT NULL DEFAULT NOW()
                )"#
            ),
            format!(
                "INSERT INTO \"{s}\".products (name, description, price_cents, stock) \
                 SELECT 'Sample Tee', 'Organic cotton t-shirt', 2500, 40 \
                 WHERE NOT EXISTS (SELECT 1 FROM \"{s}\".products)"
            ),
        ],
        Feature::Lms => vec![
            format!(
                r#"CREATE TABLE IF NOT EXISTS "{s}".courses (
                    id          UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                    title       VARCHAR(255) NOT NULL,
                    summary     TEXT,
                    published   BOOLEAN NOT NULL DEFAULT FALSE,
                    created_at  TIMESTAMPTZ NOT NULL DEFAULT NOW()
                )"#
            ),
            format!(
                r#"CREATE TABLE IF NOT EXISTS "{s}".enrollments (
                    id         UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                    course_id  UUID NOT NULL REFERENCES "{s}".courses(id) ON DELETE CASCADE,
                    student    VARCHAR(255) NOT NULL,
                    progress   INTEGER NOT NULL DEFAULT 0,
                    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
                )"#
            ),
            format!(
                "INSERT INTO \"{s}\".courses (title, summary, published) \
                 SELECT 'Getting Started', 'Introductory walkthrough', TRUE \
                 WHERE NOT EXISTS (SELECT 1 FROM \"{s}\".courses)"
            ),
        ],
        Feature::Helpdesk => vec![
            format!(
                r#"CREATE TABLE IF NOT EXISTS "{s}".tickets (
                    id         UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                    subject    VARCHAR(255) NOT NULL,
                    body       TEXT,
                    status     VARCHAR(32) NOT NULL DEFAULT 'open',
                    priority   VARCHAR(16) NOT NULL DEFAULT 'normal',
                    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
                )"#
            ),
            format!(
                "INSERT INTO \"{s}\".tickets (subject, body) \
                 SELECT 'Welcome to the helpdesk', 'Reply to this ticket to try the workflow' \
                 WHERE NOT EXISTS (SELECT 1 FROM \"{s}\".tickets)"
            ),
        ],
        Feature::Invoicing => vec![
            format!(
                r#"CREATE TABLE IF NOT EXISTS "{s}".invoices (
                    id          UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                    number      VARCHAR(32) NOT NULL UNIQUE,
                    client      VARCHAR(255) NOT NULL,
                    total_cents INTEGER NOT NULL DEFAULT 0,
                    due_date    DATE,
                    paid        BOOLEAN NOT NULL DEFAULT FALSE,
                    created_at  TIMESTAMPTZ NOT NULL DEFAULT NOW()
                )"#
            ),
            format!(
                "INSERT INTO \"{s}\".invoices (number, client, total_cents) \
                 VALUES ('INV-0001', 'Acme Corp', 120000) \
                 ON CONFLICT (number) DO NOTHING"
            ),
        ],
        Feature::Booking => vec![
            format!(
                r#"CREATE TABLE IF NOT EXISTS "{s}".bookings (
                    id         UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                    resource   VARCHAR(255) NOT NULL,
                    customer   VARCHAR(255) NOT NULL,
                    starts_at  TIMESTAMPTZ NOT NULL,
                    ends_at    TIMESTAMPTZ NOT NULL,
                    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
                )"#
            ),
        ],
        Feature::Events => vec![
            format!(
                r#"CREATE TABLE IF NOT EXISTS "{s}".events (
                    id         UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                    title      VARCHAR(255) NOT NULL,
                    venue      VARCHAR(255),
                    starts_at  TIMESTAMPTZ NOT NULL,
                    capacity   INTEGER NOT NULL DEFAULT 100,
                    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
                )"#
            ),
            format!(
                r#"CREATE TABLE IF NOT EXISTS "{s}".registrations (
                    id         UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                    event_id   UUID NOT NULL REFERENCES "{s}".events(id) ON DELETE CASCADE,
                    attendee   VARCHAR(255) NOT NULL,
                    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
                )"#
            ),
        ],
    }
}
