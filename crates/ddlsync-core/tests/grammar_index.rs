//! Index matching and index diffing against live definitions.

mod common;

use common::index;
use ddlsync_core::schema::{ForeignKeyAction, IndexChange};

#[test]
fn functional_index_tracks_first_column() {
    let trades = index("CREATE INDEX trades_years ON trades (date_part('year'::text, opendate))");
    assert_eq!(trades.columns, vec!["opendate"]);
    assert_eq!(
        trades.expr.as_deref(),
        Some("date_part('year' :: text, opendate")
    );
}

#[test]
fn two_column_functional_index() {
    let trades =
        index("CREATE INDEX trades_years ON trades (year, date_part('year'::text, opendate))");
    assert_eq!(trades.columns, vec!["year", "opendate"]);
}

#[test]
fn hash_function_is_skipped_for_column() {
    let digest = index("CREATE UNIQUE INDEX docs_digest ON docs (md5(body))");
    assert_eq!(digest.columns, vec!["body"]);
    assert!(digest.unique);
}

#[test]
fn same_columns_is_no_change() {
    let declared = index("CREATE INDEX candidates_name ON candidates (name)");
    let live = index("CREATE INDEX candidates_name ON public.candidates USING btree (name)");
    assert!(!declared.compare(&live).is_changed());
}

#[test]
fn added_column_is_a_change() {
    let declared = index("CREATE INDEX candidates_name ON candidates (name, email)");
    let live = index("CREATE INDEX candidates_name ON candidates USING btree (name)");
    let comparison = declared.compare(&live);
    assert_eq!(
        comparison.changes,
        vec![IndexChange::ColumnCount {
            live: 1,
            declared: 2
        }]
    );
}

#[test]
fn cast_inside_expression_is_a_change() {
    let declared = index("CREATE INDEX users_lower ON users (lower(email))");
    let live = index("CREATE INDEX users_lower ON public.users USING btree (lower((email)::text))");
    assert_eq!(declared.compare(&live).changes, vec![IndexChange::Expression]);
}

#[test]
fn redundant_wrapping_parens_are_ignored() {
    let declared = index("CREATE INDEX users_lower ON users (lower(email))");
    let live = index("CREATE INDEX users_lower ON public.users USING btree ((lower(email)))");
    assert!(!declared.compare(&live).is_changed());
}

#[test]
fn uniqueness_change() {
    let declared = index("CREATE UNIQUE INDEX users_email ON users (email)");
    let live = index("CREATE INDEX users_email ON users (email)");
    assert_eq!(
        declared.compare(&live).changes,
        vec![IndexChange::Uniqueness {
            live: false,
            declared: true
        }]
    );
}

#[test]
fn foreign_key_actions_are_compared() {
    let declared = index(
        "ALTER TABLE orders ADD CONSTRAINT orders_user_fk FOREIGN KEY (user_id) \
         REFERENCES users ON DELETE CASCADE",
    );
    let live = index(
        "ALTER TABLE orders ADD CONSTRAINT orders_user_fk FOREIGN KEY (user_id) \
         REFERENCES users(id) ON DELETE CASCADE",
    );
    assert!(!declared.compare(&live).is_changed());

    let live = index(
        "ALTER TABLE orders ADD CONSTRAINT orders_user_fk FOREIGN KEY (user_id) \
         REFERENCES users(id)",
    );
    assert_eq!(
        live.foreign.as_ref().map(|f| f.on_delete),
        Some(ForeignKeyAction::NoAction)
    );
    assert_eq!(declared.compare(&live).changes, vec![IndexChange::ForeignKey]);
}
