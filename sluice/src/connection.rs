//! Connection parameters naming a bridge transport.
//!
//! Commands accept a trailing `INTERFACE [HOST PORT USERNAME PASSWORD]`
//! clause. One field names a local transport, five fields name the console
//! server carrying the debug UART. Every other combination is rejected here,
//! before any I/O is attempted.

use std::fmt;

/// Validated connection parameters for one bridge transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionArgs {
    /// A transport reached through the local environment, named by interface.
    Local {
        /// Bridge driver name, e.g. `devmem`.
        interface: String,
    },
    /// A transport reached through a network console server.
    Console {
        /// Bridge driver name, e.g. `debug`.
        interface: String,
        /// Console server host.
        host: String,
        /// Console server port.
        port: u16,
        /// Login user on the console server.
        username: String,
        /// Login password on the console server.
        password: String,
    },
}

impl ConnectionArgs {
    /// Build connection parameters from the positional argument vector.
    ///
    /// Zero arguments mean "no explicit transport" and yield `None`, leaving
    /// transport selection to implicit negotiation.
    pub fn from_positional(args: &[String]) -> Result<Option<Self>, ConnectionError> {
        match args {
            [] => Ok(None),
            [interface] => {
                require_filled("INTERFACE", interface)?;
                Ok(Some(ConnectionArgs::Local {
                    interface: interface.clone(),
                }))
            }
            [interface, host, port, username, password] => {
                require_filled("INTERFACE", interface)?;
                require_filled("HOST", host)?;
                require_filled("PORT", port)?;
                require_filled("USERNAME", username)?;
                require_filled("PASSWORD", password)?;

                Ok(Some(ConnectionArgs::Console {
                    interface: interface.clone(),
                    host: host.clone(),
                    port: port.parse()?,
                    username: username.clone(),
                    password: password.clone(),
                }))
            }
            other => Err(ConnectionError::WrongArgumentCount(other.len())),
        }
    }

    /// The bridge driver the parameters name.
    pub fn interface(&self) -> &str {
        match self {
            ConnectionArgs::Local { interface } => interface,
            ConnectionArgs::Console { interface, .. } => interface,
        }
    }
}

impl fmt::Display for ConnectionArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionArgs::Local { interface } => write!(f, "{interface}"),
            ConnectionArgs::Console {
                interface,
                host,
                port,
                username,
                ..
            } => write!(f, "{interface} via {username}@{host}:{port}"),
        }
    }
}

fn require_filled(name: &'static str, value: &str) -> Result<(), ConnectionError> {
    if value.is_empty() {
        Err(ConnectionError::BlankField(name))
    } else {
        Ok(())
    }
}

/// Connection parameters were supplied in an invalid combination.
#[derive(Debug, thiserror::Error, docsplay::Display)]
pub enum ConnectionError {
    /// Wrong number of connection arguments ({0}): supply either INTERFACE or INTERFACE HOST PORT USERNAME PASSWORD.
    WrongArgumentCount(usize),

    /// Connection argument {0} must not be blank.
    BlankField(&'static str),

    /// Could not parse PORT: {0}.
    InvalidPort(#[from] std::num::ParseIntError),

    /// The '{0}' bridge is only reachable through a console server: supply INTERFACE HOST PORT USERNAME PASSWORD.
    ConsoleArgsRequired(&'static str),

    /// The '{0}' bridge is local and does not accept console server arguments.
    ConsoleArgsNotAccepted(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(fields: &[&str]) -> Vec<String> {
        fields.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn absent_clause_negotiates() {
        assert_eq!(ConnectionArgs::from_positional(&[]).unwrap(), None);
    }

    #[test]
    fn single_field_names_a_local_transport() {
        let parsed = ConnectionArgs::from_positional(&args(&["devmem"])).unwrap();

        assert_eq!(
            parsed,
            Some(ConnectionArgs::Local {
                interface: "devmem".into()
            })
        );
    }

    #[test]
    fn five_fields_name_a_console_transport() {
        let parsed =
            ConnectionArgs::from_positional(&args(&["debug", "bmcs", "2300", "op", "secret"]))
                .unwrap()
                .unwrap();

        assert_eq!(parsed.interface(), "debug");
        match parsed {
            ConnectionArgs::Console { host, port, .. } => {
                assert_eq!(host, "bmcs");
                assert_eq!(port, 2300);
            }
            other => panic!("unexpected parse: {other:?}"),
        }
    }

    #[test]
    fn blank_password_is_rejected() {
        let err = ConnectionArgs::from_positional(&args(&["debug", "bmcs", "2300", "op", ""]))
            .unwrap_err();

        assert!(matches!(err, ConnectionError::BlankField("PASSWORD")));
    }

    #[test]
    fn trailing_fields_are_rejected() {
        for fields in [
            &["devmem", "extra"][..],
            &["debug", "bmcs", "2300"][..],
            &["debug", "bmcs", "2300", "op", "secret", "extra"][..],
        ] {
            let err = ConnectionArgs::from_positional(&args(fields)).unwrap_err();
            assert!(
                matches!(err, ConnectionError::WrongArgumentCount(n) if n == fields.len()),
                "expected count error for {fields:?}, got {err:?}"
            );
        }
    }

    #[test]
    fn unparsable_port_is_rejected() {
        let err =
            ConnectionArgs::from_positional(&args(&["debug", "bmcs", "console", "op", "secret"]))
                .unwrap_err();

        assert!(matches!(err, ConnectionError::InvalidPort(_)));
    }
}
