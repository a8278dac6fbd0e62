//! SQL DDL emitter shared by every SQL dialect.

use std::fmt::Write;

use crate::model::{Column, ConstraintKind, Schema, Table};
use crate::sql::Dialect;

/// Emit CREATE TABLE blocks, then foreign keys, then table constraints,
/// then indexes.
pub fn emit_sql(schema: &Schema, dialect: Dialect) -> String {
    let mut sections: Vec<String> = schema
        .tables
        .iter()
        .map(|table| create_table(table, dialect))
        .collect();

    let foreign_keys = foreign_keys(schema, dialect);
    if !foreign_keys.is_empty() {
        sections.push(foreign_keys.join("\n"));
    }

    let constraints = constraints(schema, dialect);
    if !constraints.is_empty() {
        sections.push(constraints.join("\n"));
    }

    let indexes = indexes(schema, dialect);
    if !indexes.is_empty() {
        sections.push(indexes.join("\n"));
    }

    if sections.is_empty() {
        return String::new();
    }

    let mut output = sections.join("\n\n");
    output.push('\n');
    output
}

fn create_table(table: &Table, dialect: Dialect) -> String {
    let mut output = String::new();
    writeln!(&mut output, "CREATE TABLE {} (", dialect.quote(&table.name)).unwrap();

    let clauses: Vec<String> = table
        .columns
        .iter()
        .map(|column| format!("  {}", column_clause(column, dialect)))
        .collect();
    if !clauses.is_empty() {
        output.push_str(&clauses.join(",\n"));
        output.push('\n');
    }

    write!(&mut output, "){};", dialect.table_suffix()).unwrap();
    output
}

/// `name type [NOT NULL] [DEFAULT v] [PRIMARY KEY] [UNIQUE]`
fn column_clause(column: &Column, dialect: Dialect) -> String {
    let mut clause = format!("{} {}", dialect.quote(&column.name), column.data_type);
    if !column.nullable {
        clause.push_str(" NOT NULL");
    }
    if let Some(default) = &column.default_value {
        clause.push_str(" DEFAULT ");
        clause.push_str(default);
    }
    if column.is_primary_key {
        clause.push(' ');
        clause.push_str(dialect.primary_key_clause());
    }
    if column.is_unique {
        clause.push_str(" UNIQUE");
    }
    clause
}

fn column_list(columns: &[String], dialect: Dialect) -> String {
    columns
        .iter()
        .map(|c| dialect.quote(c))
        .collect::<Vec<_>>()
        .join(", ")
}

fn foreign_keys(schema: &Schema, dialect: Dialect) -> Vec<String> {
    schema
        .relationships
        .iter()
        .filter_map(|rel| {
            let (source, source_column) = schema.resolve(&rel.source_table_id, &rel.source_column_id)?;
            let (target, target_column) = schema.resolve(&rel.target_table_id, &rel.target_column_id)?;
            Some(format!(
                "ALTER TABLE {} ADD CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({});",
                dialect.quote(&source.name),
                dialect.quote(&rel.constraint_name),
                dialect.quote(&source_column.name),
                dialect.quote(&target.name),
                dialect.quote(&target_column.name),
            ))
        })
        .collect()
}

fn constraints(schema: &Schema, dialect: Dialect) -> Vec<String> {
    schema
        .constraints
        .iter()
        .filter_map(|constraint| {
            let table = schema.table(&constraint.table_id)?;
            let body = match &constraint.kind {
                ConstraintKind::PrimaryKey => {
                    format!("PRIMARY KEY ({})", column_list(&constraint.columns, dialect))
                }
                ConstraintKind::Unique => {
                    format!("UNIQUE ({})", column_list(&constraint.columns, dialect))
                }
                ConstraintKind::Check { expression } => format!("CHECK ({})", expression),
            };
            Some(format!(
                "ALTER TABLE {} ADD CONSTRAINT {} {};",
                dialect.quote(&table.name),
                dialect.quote(&constraint.name),
                body
            ))
        })
        .collect()
}

fn indexes(schema: &Schema, dialect: Dialect) -> Vec<String> {
    schema
        .indexes
        .iter()
        .filter_map(|index| {
            let table = schema.table(&index.table_id)?;
            Some(format!(
                "CREATE {}INDEX {} ON {} ({});",
                if index.unique { "UNIQUE " } else { "" },
                dialect.quote(&index.name),
                dialect.quote(&table.name),
                column_list(&index.columns, dialect),
            ))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        Cardinality, ColumnSpec, Constraint, Index, Relationship, TableSpec, new_id,
    };
    use crate::sql::parse_create_table_statements;
    use chrono::Utc;

    fn users_and_orders() -> Schema {
        let mut schema = Schema::new("shop");
        schema.tables.push(Table::from_spec(
            TableSpec::new("users")
                .column(ColumnSpec::new("id", "INT").primary_key())
                .column(ColumnSpec::new("email", "VARCHAR(255)").not_null().unique()),
        ));
        schema.tables.push(Table::from_spec(
            TableSpec::new("orders")
                .column(ColumnSpec::new("id", "INT").primary_key())
                .column(ColumnSpec::new("user_id", "INT"))
                .column(ColumnSpec::new("status", "TEXT").default_value("'new'")),
        ));
        let (users, orders) = (&schema.tables[0], &schema.tables[1]);
        schema.relationships.push(Relationship {
            id: new_id(),
            name: "orders_users".to_string(),
            source_table_id: orders.id.clone(),
            source_column_id: orders.columns[1].id.clone(),
            target_table_id: users.id.clone(),
            target_column_id: users.columns[0].id.clone(),
            cardinality: Cardinality::OneToMany,
            constraint_name: "FK_orders_user_id_users_id".to_string(),
            created_at: Utc::now(),
        });
        schema.indexes.push(Index {
            id: new_id(),
            name: "idx_orders_status".to_string(),
            table_id: orders.id.clone(),
            columns: vec!["status".to_string()],
            unique: false,
        });
        schema
    }

    #[test]
    fn test_generic_output() {
        let sql = emit_sql(&users_and_orders(), Dialect::Generic);
        let expected = "\
CREATE TABLE users (
  id INT NOT NULL PRIMARY KEY,
  email VARCHAR(255) NOT NULL UNIQUE
);

CREATE TABLE orders (
  id INT NOT NULL PRIMARY KEY,
  user_id INT,
  status TEXT DEFAULT 'new'
);

ALTER TABLE orders ADD CONSTRAINT FK_orders_user_id_users_id FOREIGN KEY (user_id) REFERENCES users (id);

CREATE INDEX idx_orders_status ON orders (status);
";
        assert_eq!(sql, expected);
    }

    #[test]
    fn test_mysql_output() {
        let sql = emit_sql(&users_and_orders(), Dialect::MySQL);
        assert!(sql.contains("CREATE TABLE `users` ("));
        assert!(sql.contains("`id` INT NOT NULL AUTO_INCREMENT PRIMARY KEY"));
        assert!(sql.contains(") ENGINE=InnoDB DEFAULT CHARSET=utf8mb4;"));
        assert!(sql.contains("REFERENCES `users` (`id`);"));
    }

    #[test]
    fn test_sqlserver_and_postgres_output() {
        let schema = users_and_orders();
        let mssql = emit_sql(&schema, Dialect::SqlServer);
        assert!(mssql.contains("[id] INT NOT NULL IDENTITY(1,1) PRIMARY KEY"));

        let pg = emit_sql(&schema, Dialect::PostgreSQL);
        assert!(pg.contains("\"id\" INT NOT NULL PRIMARY KEY,"));
        assert!(pg.contains("CREATE INDEX \"idx_orders_status\" ON \"orders\" (\"status\");"));
        assert!(!pg.contains("ENGINE"));
    }

    #[test]
    fn test_constraints_section() {
        let mut schema = users_and_orders();
        let users_id = schema.tables[0].id.clone();
        schema.constraints.push(Constraint {
            id: new_id(),
            name: "CK_users_id".to_string(),
            table_id: users_id,
            columns: vec![],
            kind: ConstraintKind::Check {
                expression: "id > 0".to_string(),
            },
        });

        let sql = emit_sql(&schema, Dialect::Generic);
        assert!(sql.contains("ALTER TABLE users ADD CONSTRAINT CK_users_id CHECK (id > 0);"));
    }

    #[test]
    fn test_unresolved_relationship_is_skipped() {
        let mut schema = users_and_orders();
        schema.tables.remove(0);
        let sql = emit_sql(&schema, Dialect::Generic);
        assert!(!sql.contains("FOREIGN KEY"));
    }

    #[test]
    fn test_deterministic_and_read_only() {
        let schema = users_and_orders();
        let before = schema.clone();
        assert_eq!(emit_sql(&schema, Dialect::Oracle), emit_sql(&schema, Dialect::Oracle));
        assert_eq!(schema, before);
    }

    #[test]
    fn test_empty_schema() {
        assert_eq!(emit_sql(&Schema::new("empty"), Dialect::Generic), "");
    }

    #[test]
    fn test_round_trip_names_and_nullability() {
        let schema = users_and_orders();
        let parsed = parse_create_table_statements(&emit_sql(&schema, Dialect::Generic));

        assert_eq!(parsed.len(), schema.tables.len());
        for (original, reparsed) in schema.tables.iter().zip(&parsed) {
            assert_eq!(original.name, reparsed.name);
            let expected: Vec<_> = original.columns.iter().map(|c| (&c.name, c.nullable)).collect();
            let actual: Vec<_> = reparsed.columns.iter().map(|c| (&c.name, c.nullable)).collect();
            assert_eq!(expected, actual);
        }
    }

    #[test]
    fn test_round_trip_keyword_named_columns() {
        let mut schema = Schema::new("s");
        schema.tables.push(Table::from_spec(
            TableSpec::new("settings")
                .column(ColumnSpec::new("key", "VARCHAR(50)").not_null())
                .column(ColumnSpec::new("index", "INT"))
                .column(ColumnSpec::new("value", "TEXT")),
        ));

        let parsed = parse_create_table_statements(&emit_sql(&schema, Dialect::Generic));
        let actual: Vec<_> = parsed[0].columns.iter().map(|c| (c.name.as_str(), c.nullable)).collect();
        assert_eq!(actual, [("key", false), ("index", true), ("value", true)]);
    }
}
