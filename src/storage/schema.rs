use rusqlite::Connection;

/// Knobs for table creation.
#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaOptions {
    /// Adds UNIQUE to `User.Name` and `User.Surname`.
    pub unique_user_names: bool,
}

/// Creates the four ledger tables if they are missing. Seeds nothing.
pub fn create_schema(conn: &Connection, options: SchemaOptions) -> rusqlite::Result<()> {
    let unique = if options.unique_user_names { "UNIQUE" } else { "" };

    conn.execute_batch(&format!(
        "CREATE TABLE IF NOT EXISTS Bank (
            Id INTEGER PRIMARY KEY,
            Name TEXT NOT NULL UNIQUE
        );

        CREATE TABLE IF NOT EXISTS TransactionTable (
            Id INTEGER PRIMARY KEY,
            Bank_sender_name TEXT NOT NULL,
            Account_sender_id TEXT NOT NULL,
            Bank_receiver_name TEXT NOT NULL,
            Account_receiver_id TEXT NOT NULL,
            Sent_Currency TEXT NOT NULL,
            Sent_Amount TEXT NOT NULL,
            Datetime TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS User (
            Id INTEGER PRIMARY KEY,
            Name TEXT NOT NULL {unique},
            Surname TEXT NOT NULL {unique},
            Birth_day TEXT
        );

        CREATE TABLE IF NOT EXISTS Account (
            Id INTEGER PRIMARY KEY,
            User_id INTEGER NOT NULL,
            Type TEXT NOT NULL CHECK(Type IN ('credit', 'debit')),
            Account_Number TEXT NOT NULL UNIQUE,
            Bank_id INTEGER NOT NULL,
            Currency TEXT NOT NULL,
            Amount TEXT NOT NULL,
            Status TEXT NOT NULL CHECK(Status IN ('gold', 'silver', 'platinum')),
            FOREIGN KEY (User_id) REFERENCES User (Id),
            FOREIGN KEY (Bank_id) REFERENCES Bank (Id)
        );

        CREATE INDEX IF NOT EXISTS idx_account_user ON Account(User_id);
        CREATE INDEX IF NOT EXISTS idx_transaction_sender ON TransactionTable(Account_sender_id);"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_names(conn: &Connection) -> Vec<String> {
        let mut stmt = conn
            .prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
            .unwrap();
        stmt.query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<Vec<String>, _>>()
            .unwrap()
    }

    #[test]
    fn test_creates_all_tables() {
        let conn = Connection::open_in_memory().unwrap();
        create_schema(&conn, SchemaOptions::default()).unwrap();
        assert_eq!(
            table_names(&conn),
            vec!["Account", "Bank", "TransactionTable", "User"]
        );
    }

    #[test]
    fn test_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        create_schema(&conn, SchemaOptions::default()).unwrap();
        conn.execute("INSERT INTO Bank (Id, Name) VALUES (1, 'Bank A')", [])
            .unwrap();
        create_schema(&conn, SchemaOptions::default()).unwrap();

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM Bank", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_status_check_constraint() {
        let conn = Connection::open_in_memory().unwrap();
        create_schema(&conn, SchemaOptions::default()).unwrap();
        let result = conn.execute(
            "INSERT INTO Account (User_id, Type, Account_Number, Bank_id, Currency, Amount, Status)
             VALUES (1, 'debit', 'ID--abc-1234567890', 1, 'USD', '10', 'bronze')",
            [],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_unique_user_names_option() {
        let conn = Connection::open_in_memory().unwrap();
        create_schema(&conn, SchemaOptions { unique_user_names: true }).unwrap();
        conn.execute("INSERT INTO User (Name, Surname) VALUES ('Jane', 'Doe')", [])
            .unwrap();
        let duplicate = conn.execute("INSERT INTO User (Name, Surname) VALUES ('Jane', 'Roe')", []);
        assert!(duplicate.is_err());
    }
}
