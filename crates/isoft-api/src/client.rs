// Command dispatcher for the appliance protocol
//
// Wraps a `Transport` with session bookkeeping: it makes sure login,
// unit discovery and the connect handshake have happened before a
// command goes out, stamps every request with the next message number
// and the current token, and heals "not logged in" / "not connected"
// faults by redoing the missing step and resending the command.

use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use url::Url;

use crate::command::{Command, CommandKind};
use crate::error::Error;
use crate::models::{self, ALREADY_CONNECTED, DeviceResponse, Reply};
use crate::session::{Session, SessionState};
use crate::transport::{Transport, TransportConfig};

/// Recoveries (re-login or reconnect) allowed within one call before
/// the device is considered misbehaving.
pub const MAX_RECOVERIES: u32 = 2;

/// Client for one i-soft controller.
///
/// The session lock is held for the whole of each call, so concurrent
/// callers are served one at a time and message numbers never race.
pub struct IsoftClient {
    transport: Transport,
    base_url: Url,
    username: String,
    password: SecretString,
    session: Mutex<Session>,
}

impl IsoftClient {
    /// Create a client that builds its own HTTP client from `transport`.
    pub fn new(
        base_url: Url,
        username: impl Into<String>,
        password: SecretString,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        Ok(Self::with_transport(
            Transport::new(transport)?,
            base_url,
            username,
            password,
        ))
    }

    /// Create a client on top of an HTTP client owned by the caller,
    /// with the default timeout and retry policy.
    pub fn with_client(
        http: reqwest::Client,
        base_url: Url,
        username: impl Into<String>,
        password: SecretString,
    ) -> Self {
        let defaults = TransportConfig::default();
        let transport = Transport::with_client(http, defaults.timeout, defaults.retry);
        Self::with_transport(transport, base_url, username, password)
    }

    pub fn with_transport(
        transport: Transport,
        base_url: Url,
        username: impl Into<String>,
        password: SecretString,
    ) -> Self {
        Self {
            transport,
            base_url,
            username: username.into(),
            password,
            session: Mutex::new(Session::new()),
        }
    }

    /// `https://{host}:{port}/`, the only endpoint the device serves.
    pub fn device_url(host: &str, port: u16) -> Result<Url, Error> {
        Ok(Url::parse(&format!("https://{host}:{port}/"))?)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    /// Snapshot of the current session.
    pub async fn session(&self) -> Session {
        self.session.lock().await.clone()
    }

    // ── Public operations ────────────────────────────────────────────

    /// Run one command and return its `data` payload.
    ///
    /// Returns `None` when the device answered without data or with an
    /// error that is not a session fault. A connect answered with
    /// "already connected" returns that literal string.
    pub async fn execute(&self, command: &Command) -> Result<Option<Value>, Error> {
        let mut session = self.session.lock().await;
        self.run(&mut session, Some(command)).await
    }

    /// Log in with the configured credentials.
    pub async fn login(&self) -> Result<(), Error> {
        self.execute(&self.login_command()).await.map(|_| ())
    }

    /// Bring the session up to `Connected`, logging in and discovering
    /// the unit as needed. Returns the state reached.
    pub async fn connect(&self) -> Result<SessionState, Error> {
        let mut session = self.session.lock().await;
        self.run(&mut session, None).await?;
        Ok(session.state())
    }

    // ── Dispatch loop ────────────────────────────────────────────────

    /// Drive the session toward `target`, then send it.
    ///
    /// With no target, stop once the connect precondition is settled.
    async fn run(
        &self,
        session: &mut Session,
        target: Option<&Command>,
    ) -> Result<Option<Value>, Error> {
        let mut recoveries = 0;
        let mut connect_tried = false;

        loop {
            let step = self.plan(session, target, connect_tried);
            let (command, is_target) = match (&step, target) {
                (Some(pre), _) => (pre, false),
                (None, Some(target)) => (target, true),
                (None, None) => return Ok(None),
            };

            let data = match self.round_trip(session, command).await? {
                Reply::Data(data) => data,
                // Counts as success on every step; only a connect learns
                // anything from it.
                Reply::AlreadyConnected => {
                    if command.kind() == CommandKind::Connect {
                        session.mark_connected();
                    }
                    Some(Value::String(ALREADY_CONNECTED.into()))
                }
                Reply::NotLoggedIn => {
                    if command.kind() == CommandKind::Login {
                        return Err(Error::Authentication {
                            message: "device refused the login command".into(),
                            status: None,
                        });
                    }
                    spend_recovery(&mut recoveries, models::NOT_LOGGED_IN)?;
                    session.reset_login();
                    continue;
                }
                Reply::NotConnected => {
                    spend_recovery(&mut recoveries, models::NOT_CONNECTED)?;
                    session.mark_disconnected();
                    connect_tried = false;
                    continue;
                }
            };

            // Every precondition step either advances the session or ends
            // the call here.
            match command.kind() {
                CommandKind::Login if !is_target && !session.has_token() => {
                    return Err(Error::protocol("login reply carried no token"));
                }
                CommandKind::Show => {
                    let identified = adopt_first_unit(session, data.as_ref())?;
                    if !is_target && !identified {
                        return Err(Error::protocol("device reported no units"));
                    }
                }
                CommandKind::Connect if !is_target => connect_tried = true,
                _ => {}
            }
            if is_target {
                return Ok(data);
            }
        }
    }

    /// The precondition to send before `target`, if any.
    fn plan(
        &self,
        session: &Session,
        target: Option<&Command>,
        connect_tried: bool,
    ) -> Option<Command> {
        let kind = target.map_or(CommandKind::Regular, Command::kind);
        if kind != CommandKind::Login && !session.has_token() {
            return Some(self.login_command());
        }

        let wants_connection =
            kind == CommandKind::Regular && !session.is_connected() && !connect_tried;
        if kind == CommandKind::Regular && !wants_connection {
            return None;
        }
        if (kind == CommandKind::Connect || wants_connection) && !session.is_identified() {
            return Some(Command::show());
        }
        if wants_connection {
            if let (Some(wtu_type), Some(serial)) = (session.device_type(), session.serial_number())
            {
                return Some(Command::connect(wtu_type, serial));
            }
        }
        None
    }

    /// Send one request and fold the reply into the session.
    async fn round_trip(&self, session: &mut Session, command: &Command) -> Result<Reply, Error> {
        let msgnumber = session.next_message_number();
        let url = command.to_url(&self.base_url, msgnumber, session.token());
        debug!(
            group = command.group(),
            command = command.name(),
            msgnumber,
            "requesting"
        );

        let response: DeviceResponse = self.transport.submit(&url).await?;
        debug!(
            msgnumber,
            status = ?response.status,
            error = ?response.error,
            data = ?response.data,
            "response"
        );

        session.absorb(&response);
        if response.is_ok() && command.kind() == CommandKind::Connect {
            session.mark_connected();
        }
        Ok(response.reply())
    }

    fn login_command(&self) -> Command {
        Command::login(&self.username, self.password.expose_secret())
    }
}

/// Take identity from the first unit in a `register/show` payload.
fn adopt_first_unit(session: &mut Session, data: Option<&Value>) -> Result<bool, Error> {
    let Some(unit) = models::first_unit(data)? else {
        return Ok(false);
    };
    session.identify(unit.wtu_type, unit.serial_number);
    Ok(true)
}

fn spend_recovery(recoveries: &mut u32, fault: &str) -> Result<(), Error> {
    if *recoveries >= MAX_RECOVERIES {
        warn!(fault, "recovery budget exhausted");
        return Err(Error::protocol(format!(
            "device still reports '{fault}' after {MAX_RECOVERIES} recoveries"
        )));
    }
    *recoveries += 1;
    debug!(fault, attempt = *recoveries, "recovering session");
    Ok(())
}

impl std::fmt::Debug for IsoftClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IsoftClient")
            .field("base_url", &self.base_url.as_str())
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}
