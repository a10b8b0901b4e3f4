//! Six-message mutual handshake run once per connection, before any FE
//! traffic is permitted on the data channel.
//!
//! The handshake exchanges raw bytes on the data endpoint, not FE frames —
//! `FE DC BA` framing only starts once the device considers the host
//! authenticated. [`crate::bus::NotificationBus`] recognizes this: bytes
//! that fail to decode as an FE frame are queued as
//! [`crate::bus::QueueItem::Raw`], which is exactly what this handshake
//! waits on.

use std::{sync::Arc, time::Duration};

use ledbadge_crypto::{BLOCK_SIZE, challenge_response, random_auth_message};

use crate::{
    bus::NotificationBus,
    connection::ConnectionState,
    error::{CoreError, Result},
    transport::{Transport, WriteEndpoint},
};

/// Per-step timeout: 5 s.
const STEP_TIMEOUT: Duration = Duration::from_secs(5);

const PASS: [u8; 4] = *b"pass";

/// Drives the six-message handshake over a [`Transport`]/[`NotificationBus`]
/// pair, marking `state` authenticated on success.
pub struct AuthEngine {
    transport: Arc<Transport>,
    bus: Arc<NotificationBus>,
}

impl AuthEngine {
    /// Build an engine over the given transport and bus.
    #[must_use]
    pub fn new(transport: Arc<Transport>, bus: Arc<NotificationBus>) -> Self {
        Self { transport, bus }
    }

    /// Run the handshake. Idempotent: if `state` is already authenticated,
    /// returns immediately without touching the wire.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::AuthFailed`] if any step's reply is malformed
    /// or the final confirmation doesn't match, and [`CoreError::Timeout`]
    /// if any step's reply doesn't arrive within 5 seconds.
    pub async fn authenticate(&self, state: &ConnectionState) -> Result<()> {
        if state.is_authenticated() {
            return Ok(());
        }

        // Step 1: host -> [0x00, rand_16].
        let hello = random_auth_message()?;
        self.transport.write(WriteEndpoint::Data, &hello).await?;

        // Step 2: device -> [0x01, enc_16]. Ciphertext is not verified; its
        // presence alone confirms the device is in the handshake state.
        let device_hello = self
            .bus
            .wait_for_raw("auth step 2", STEP_TIMEOUT, |bytes| {
                bytes.len() == 1 + BLOCK_SIZE && bytes[0] == 0x01
            })
            .await?;
        let _ = device_hello;

        // Step 3: host -> [0x02, 'p','a','s','s'].
        let mut ack = [0u8; 5];
        ack[0] = 0x02;
        ack[1..].copy_from_slice(&PASS);
        self.transport.write(WriteEndpoint::Data, &ack).await?;

        // Step 4: device -> [0x00, challenge_16].
        let challenge_msg = self
            .bus
            .wait_for_raw("auth step 4", STEP_TIMEOUT, |bytes| {
                bytes.len() == 1 + BLOCK_SIZE && bytes[0] == 0x00
            })
            .await?;
        let mut challenge = [0u8; BLOCK_SIZE];
        challenge.copy_from_slice(&challenge_msg[1..]);

        // Step 5: host -> [0x01, encrypt(challenge, STATIC_KEY)].
        let response = challenge_response(&challenge);
        self.transport.write(WriteEndpoint::Data, &response).await?;

        // Step 6: device -> [0x02, 'p','a','s','s'] on success, anything
        // else is a fatal auth failure.
        let confirmation = self.bus.wait_for_raw("auth step 6", STEP_TIMEOUT, |_| true).await?;
        if confirmation.len() != 1 + PASS.len() || confirmation[0] != 0x02 || confirmation[1..] != PASS
        {
            return Err(CoreError::AuthFailed { step: 6 });
        }

        state.mark_authenticated();
        Ok(())
    }
}
