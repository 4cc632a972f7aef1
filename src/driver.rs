//! # Driver Module - *Database driver boundary*
//!
//! Interfaces a database driver implements to hand query results over as
//! record batch streams: `Driver` → `Database` → `Connection` → `Statement`.
//! No network driver ships with this crate.
//!
//! [`Session`] owns one of each and releases them in reverse order of
//! acquisition.

use std::collections::BTreeMap;
use std::fmt;

use tracing::{debug, warn};

use crate::compute::datum::BatchReader;
use crate::enums::error::{BridgeError, Result};
use crate::structs::table::Table;

/// String key/value options passed to a driver, e.g. `uri` or `username`.
pub type DriverOptions = BTreeMap<String, String>;

/// Result of executing a statement.
pub struct QueryResult {
    /// `None` when the driver cannot tell.
    pub rows_affected: Option<i64>,
    /// `None` for statements that produce no rows.
    pub stream: Option<Box<dyn BatchReader>>,
}

impl QueryResult {
    /// Drains the stream into a table, if there is one.
    pub fn into_table(self) -> Result<Option<Table>> {
        match self.stream {
            Some(mut stream) => stream.read_all().map(Some),
            None => Ok(None),
        }
    }
}

impl fmt::Debug for QueryResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryResult")
            .field("rows_affected", &self.rows_affected)
            .field("stream", &self.stream.as_ref().map(|s| s.schema()))
            .finish()
    }
}

pub trait Driver {
    fn open_database(&self, options: &DriverOptions) -> Result<Box<dyn Database>>;
}

pub trait Database {
    fn connect(&mut self, options: &DriverOptions) -> Result<Box<dyn Connection>>;
    fn release(&mut self) -> Result<()>;
}

pub trait Connection {
    fn new_statement(&mut self) -> Result<Box<dyn Statement>>;
    fn release(&mut self) -> Result<()>;
}

pub trait Statement {
    fn set_sql_query(&mut self, query: &str) -> Result<()>;
    fn execute_query(&mut self) -> Result<QueryResult>;
    fn release(&mut self) -> Result<()>;
}

/// # Session
///
/// A database, connection and statement acquired together.
///
/// [`Session::close`] releases each at most once, statement first, and keeps
/// going past failures. Dropping an open session closes it.
pub struct Session {
    database: Option<Box<dyn Database>>,
    connection: Option<Box<dyn Connection>>,
    statement: Option<Box<dyn Statement>>,
}

impl Session {
    /// Opens a database, connects and prepares a statement. Anything already
    /// acquired is released again if a later step fails.
    pub fn open(driver: &dyn Driver, options: &DriverOptions) -> Result<Self> {
        let mut session = Session { database: None, connection: None, statement: None };
        let database = session.database.insert(driver.open_database(options)?);
        let connection = session.connection.insert(database.connect(options)?);
        session.statement = Some(connection.new_statement()?);
        debug!(options = options.len(), "session opened");
        Ok(session)
    }

    #[inline]
    pub fn is_open(&self) -> bool {
        self.database.is_some() || self.connection.is_some() || self.statement.is_some()
    }

    /// Runs `sql` on the session's statement.
    pub fn query(&mut self, sql: &str) -> Result<QueryResult> {
        let statement = self
            .statement
            .as_mut()
            .ok_or_else(|| BridgeError::InvalidState("session is closed".into()))?;
        statement.set_sql_query(sql)?;
        statement.execute_query()
    }

    /// Releases statement, connection and database, in that order.
    ///
    /// Every release is attempted. The first failure is returned.
    pub fn close(&mut self) -> Result<()> {
        let mut first = None;
        let mut record = |what: &str, result: Result<()>| {
            if let Err(e) = result {
                warn!(resource = what, error = %e, "release failed");
                if first.is_none() {
                    first = Some(e);
                }
            }
        };
        if let Some(mut statement) = self.statement.take() {
            record("statement", statement.release());
        }
        if let Some(mut connection) = self.connection.take() {
            record("connection", connection.release());
        }
        if let Some(mut database) = self.database.take() {
            record("database", database.release());
        }
        first.map_or(Ok(()), Err)
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if self.is_open() {
            let _ = self.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::enums::status::StatusCode;

    type Log = Arc<Mutex<Vec<&'static str>>>;

    struct Resource {
        name: &'static str,
        log: Log,
        fail: bool,
    }

    impl Resource {
        fn release(&mut self) -> Result<()> {
            self.log.lock().unwrap().push(self.name);
            if self.fail {
                Err(BridgeError::External { code: StatusCode::Io, message: self.name.into() })
            } else {
                Ok(())
            }
        }
    }

    struct FakeDriver {
        log: Log,
        failing: &'static [&'static str],
    }

    impl FakeDriver {
        fn resource(&self, name: &'static str) -> Resource {
            Resource { name, log: self.log.clone(), fail: self.failing.contains(&name) }
        }
    }

    struct FakeDatabase(Resource, Log, &'static [&'static str]);
    struct FakeConnection(Resource);
    struct FakeStatement(Resource);

    impl Driver for FakeDriver {
        fn open_database(&self, _: &DriverOptions) -> Result<Box<dyn Database>> {
            Ok(Box::new(FakeDatabase(self.resource("database"), self.log.clone(), self.failing)))
        }
    }

    impl Database for FakeDatabase {
        fn connect(&mut self, _: &DriverOptions) -> Result<Box<dyn Connection>> {
            let fail = self.2.contains(&"connection");
            Ok(Box::new(FakeConnection(Resource { name: "connection", log: self.1.clone(), fail })))
        }
        fn release(&mut self) -> Result<()> {
            self.0.release()
        }
    }

    impl Connection for FakeConnection {
        fn new_statement(&mut self) -> Result<Box<dyn Statement>> {
            let log = self.0.log.clone();
            Ok(Box::new(FakeStatement(Resource { name: "statement", log, fail: false })))
        }
        fn release(&mut self) -> Result<()> {
            self.0.release()
        }
    }

    impl Statement for FakeStatement {
        fn set_sql_query(&mut self, _: &str) -> Result<()> {
            Ok(())
        }
        fn execute_query(&mut self) -> Result<QueryResult> {
            Ok(QueryResult { rows_affected: Some(0), stream: None })
        }
        fn release(&mut self) -> Result<()> {
            self.0.release()
        }
    }

    #[test]
    fn test_close_releases_in_reverse_order_once() {
        let log = Log::default();
        let driver = FakeDriver { log: log.clone(), failing: &[] };
        let mut session = Session::open(&driver, &DriverOptions::new()).unwrap();
        let result = session.query("SELECT 1").unwrap();
        assert_eq!(result.rows_affected, Some(0));
        assert!(result.into_table().unwrap().is_none());

        session.close().unwrap();
        session.close().unwrap();
        drop(session);
        assert_eq!(*log.lock().unwrap(), vec!["statement", "connection", "database"]);
    }

    #[test]
    fn test_close_continues_past_failure() {
        let log = Log::default();
        let driver = FakeDriver { log: log.clone(), failing: &["connection", "database"] };
        let mut session = Session::open(&driver, &DriverOptions::new()).unwrap();
        let err = session.close().unwrap_err();
        assert_eq!(err.status_code(), StatusCode::Io);
        assert_eq!(err.to_string(), "IO (10): connection");
        assert_eq!(*log.lock().unwrap(), vec!["statement", "connection", "database"]);
        assert!(!session.is_open());
        assert!(matches!(session.query("x"), Err(BridgeError::InvalidState(_))));
    }
}
