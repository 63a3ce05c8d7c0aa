// Command descriptors and request URL construction.
//
// A command is the `group` + `command` verb pair plus ordered
// parameters. The message number and token are injected at submission
// time by the client, never stored on the command.

use std::fmt;

use url::Url;

/// Session bookkeeping commands skip the connect precondition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Login,
    Show,
    Connect,
    Regular,
}

/// An immutable device command.
#[derive(Clone, PartialEq, Eq)]
pub struct Command {
    group: String,
    name: String,
    params: Vec<(String, String)>,
}

impl Command {
    pub fn new(group: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            name: name.into(),
            params: Vec::new(),
        }
    }

    /// Append a parameter. Order is preserved on the wire.
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    /// `register/login` with the customer role.
    pub fn login(username: &str, password: &str) -> Self {
        Self::new("register", "login")
            .param("name", "login")
            .param("user", username)
            .param("password", password)
            .param("role", "customer")
    }

    /// `register/show`: list the units behind this controller.
    pub fn show() -> Self {
        Self::new("register", "show")
    }

    /// `register/connect` to one unit.
    pub fn connect(wtu_type: &str, serial_number: &str) -> Self {
        Self::new("register", "connect")
            .param("parameter", wtu_type)
            .param("serial number", serial_number)
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    pub fn kind(&self) -> CommandKind {
        match self.name.as_str() {
            "login" => CommandKind::Login,
            "show" => CommandKind::Show,
            "connect" => CommandKind::Connect,
            _ => CommandKind::Regular,
        }
    }

    /// Build the request URL.
    ///
    /// Parameters are joined literally as `key=value` pairs, the way the
    /// device parses them. Only the URL parser's own escaping applies
    /// (spaces become `%20`), so values must not contain `&` or `=`.
    pub fn to_url(&self, base: &Url, msgnumber: u64, token: Option<&str>) -> Url {
        let mut query = format!(
            "group={}&command={}&msgnumber={msgnumber}",
            self.group, self.name
        );
        if self.kind() != CommandKind::Login {
            if let Some(token) = token {
                query.push_str("&token=");
                query.push_str(token);
            }
        }
        for (key, value) in &self.params {
            query.push('&');
            query.push_str(key);
            query.push('=');
            query.push_str(value);
        }

        let mut url = base.clone();
        url.set_query(Some(&query));
        url
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params: Vec<(&str, &str)> = self
            .params
            .iter()
            .map(|(k, v)| {
                let shown = if k == "password" { "***" } else { v.as_str() };
                (k.as_str(), shown)
            })
            .collect();
        f.debug_struct("Command")
            .field("group", &self.group)
            .field("name", &self.name)
            .field("params", &params)
            .finish()
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.group, self.name)
    }
}
