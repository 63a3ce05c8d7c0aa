// Session state for one client.
//
// Token, unit identity and the connected flag are only changed through
// the transition methods below, and only after a complete reply was
// decoded. The message counter is the one exception: it advances before
// each request is sent.

use std::fmt;

use tracing::debug;

use crate::models::DeviceResponse;

/// Derived view of where the session stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No token held.
    Unauthenticated,
    /// Token held, unit type or serial still unknown.
    Authenticated,
    /// Token and unit identity known, not connected to the unit.
    Identified,
    /// The unit accepted a connect handshake.
    Connected,
}

#[derive(Clone, Default, PartialEq, Eq)]
pub struct Session {
    token: Option<String>,
    device_type: Option<String>,
    serial_number: Option<String>,
    connected: bool,
    message_sequence: u64,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SessionState {
        if self.token.is_none() {
            SessionState::Unauthenticated
        } else if self.connected {
            SessionState::Connected
        } else if self.is_identified() {
            SessionState::Identified
        } else {
            SessionState::Authenticated
        }
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn device_type(&self) -> Option<&str> {
        self.device_type.as_deref()
    }

    pub fn serial_number(&self) -> Option<&str> {
        self.serial_number.as_deref()
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    pub fn is_identified(&self) -> bool {
        self.device_type.is_some() && self.serial_number.is_some()
    }

    /// Last message number handed out (0 before the first request).
    pub fn message_sequence(&self) -> u64 {
        self.message_sequence
    }

    /// Allocate the number for the next request.
    pub(crate) fn next_message_number(&mut self) -> u64 {
        self.message_sequence += 1;
        self.message_sequence
    }

    /// Pick up token and identity from any reply that carries them.
    ///
    /// A token rotation leaves the connected flag alone.
    pub(crate) fn absorb(&mut self, response: &DeviceResponse) {
        if let Some(token) = &response.token {
            if self.token.as_ref() != Some(token) {
                debug!("session token updated");
                self.token = Some(token.clone());
            }
        }
        if let Some(wtu_type) = &response.wtu_type {
            if self.device_type.as_ref() != Some(wtu_type) {
                self.device_type = Some(wtu_type.clone());
            }
        }
        if let Some(serial) = &response.serial_number {
            if self.serial_number.as_ref() != Some(serial) {
                self.serial_number = Some(serial.clone());
            }
        }
    }

    /// Record the unit picked from `register/show`.
    pub(crate) fn identify(&mut self, device_type: String, serial_number: String) {
        debug!(device_type = %device_type, serial = %serial_number, "unit identified");
        self.device_type = Some(device_type);
        self.serial_number = Some(serial_number);
    }

    pub(crate) fn mark_connected(&mut self) {
        if !self.connected {
            debug!("session connected");
        }
        self.connected = true;
    }

    /// The unit dropped our connection; identity and token stay.
    pub(crate) fn mark_disconnected(&mut self) {
        debug!("session disconnected by device");
        self.connected = false;
    }

    /// The token went stale. Only the token is forgotten; like a token
    /// rotation, this leaves the connected flag and identity alone.
    pub(crate) fn reset_login(&mut self) {
        debug!("session token rejected by device");
        self.token = None;
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("token", &self.token.as_ref().map(|_| "***"))
            .field("device_type", &self.device_type)
            .field("serial_number", &self.serial_number)
            .field("connected", &self.connected)
            .field("message_sequence", &self.message_sequence)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn reply(token: Option<&str>, wtu: Option<&str>, serial: Option<&str>) -> DeviceResponse {
        DeviceResponse {
            token: token.map(Into::into),
            wtu_type: wtu.map(Into::into),
            serial_number: serial.map(Into::into),
            ..DeviceResponse::default()
        }
    }

    #[test]
    fn walks_through_states() {
        let mut s = Session::new();
        assert_eq!(s.state(), SessionState::Unauthenticated);

        s.absorb(&reply(Some("t1"), None, None));
        assert_eq!(s.state(), SessionState::Authenticated);

        s.identify("i-soft safe+".into(), "200123".into());
        assert_eq!(s.state(), SessionState::Identified);

        s.mark_connected();
        assert_eq!(s.state(), SessionState::Connected);

        s.mark_disconnected();
        assert_eq!(s.state(), SessionState::Identified);

        s.mark_connected();
        s.reset_login();
        assert_eq!(s.state(), SessionState::Unauthenticated);
        assert!(s.is_identified());
    }

    #[test]
    fn stale_token_keeps_connection() {
        let mut s = Session::new();
        s.absorb(&reply(Some("t1"), Some("type"), Some("sn")));
        s.mark_connected();

        s.reset_login();
        assert!(!s.has_token());
        assert!(s.is_connected());

        s.absorb(&reply(Some("t2"), None, None));
        assert_eq!(s.state(), SessionState::Connected);
    }

    #[test]
    fn token_rotation_keeps_connection() {
        let mut s = Session::new();
        s.absorb(&reply(Some("t1"), Some("type"), Some("sn")));
        s.mark_connected();
        s.absorb(&reply(Some("t2"), None, None));
        assert_eq!(s.token(), Some("t2"));
        assert!(s.is_connected());
        assert_eq!(s.device_type(), Some("type"));
        assert_eq!(s.serial_number(), Some("sn"));
    }

    #[test]
    fn message_numbers_start_at_one() {
        let mut s = Session::new();
        assert_eq!(s.message_sequence(), 0);
        assert_eq!(s.next_message_number(), 1);
        assert_eq!(s.next_message_number(), 2);
        assert_eq!(s.message_sequence(), 2);
    }

    #[test]
    fn debug_hides_token() {
        let mut s = Session::new();
        s.absorb(&reply(Some("very-secret"), None, None));
        assert!(!format!("{s:?}").contains("very-secret"));
    }
}
