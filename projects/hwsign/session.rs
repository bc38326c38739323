//! Device signing session
//!
//! Drives one hardware-wallet exchange for a single pending transaction:
//! optional model detection, address retrieval and verification, the sign
//! request with payload streaming, then finalization. The sign request is
//! never sent before the device proved it controls the sender address.

use ethereum_types::Address;
use std::sync::Arc;

use crate::chains::ethereum::{
    build_sign_request, decode_device_address, finalize, PendingTransaction, SignatureComponents,
};
use crate::config::SignerConfig;
use crate::device::{self, DeviceModel};
use crate::error::{Result, SigningError};
use crate::messages::{
    failure_type, ButtonAck, Cancel, EthereumGetAddress, EthereumTxAck, EthereumTxRequest, Failure,
    Message, PassphraseAck, PinMatrixAck,
};
use crate::path::DerivationPath;
use crate::prompts::{PinKind, SessionPrompts};
use crate::store::{AddressBook, TransactionStore};
use crate::transport::Transport;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    AwaitingAddress,
    ProcessingTask,
    Completed,
    Cancelled,
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Completed | SessionState::Cancelled)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CancelReason {
    /// The device controls a different key than the transaction sender
    AddressMismatch { reported: Address, expected: Address },
    /// A PIN or passphrase prompt was dismissed
    User,
    /// The user rejected the action on the device
    Device,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SigningOutcome {
    Signed { tx_hash: ethereum_types::H256 },
    Cancelled(CancelReason),
}

/// Everything resolved before the device is contacted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    pub derivation_path: DerivationPath,
    /// `None` asks the device via `Initialize`
    pub device_model: Option<DeviceModel>,
    pub show_display: bool,
}

impl SessionContext {
    /// Look up the derivation path of `sender` and merge in the signer settings
    pub async fn resolve<B: AddressBook + ?Sized>(
        book: &B,
        sender: &Address,
        config: &SignerConfig,
    ) -> Result<Self> {
        let path = book
            .derivation_path(sender)
            .await
            .map_err(|e| SigningError::Config(format!("address book lookup failed: {:#}", e)))?
            .ok_or(SigningError::MissingDerivationPath(*sender))?;

        Ok(Self {
            derivation_path: path.parse()?,
            device_model: config.device_model,
            show_display: config.show_display,
        })
    }
}

/// What the session does after handling one device message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Continue,
    Done(SigningOutcome),
}

pub struct SigningSession<'a, T, P, S>
where
    T: Transport + ?Sized,
    P: SessionPrompts + ?Sized,
    S: TransactionStore + ?Sized + 'static,
{
    context: SessionContext,
    transport: &'a mut T,
    prompts: &'a P,
    store: Arc<S>,
    tx: &'a mut PendingTransaction,
    state: SessionState,
    model: Option<DeviceModel>,
    data_offset: usize,
}

impl<'a, T, P, S> SigningSession<'a, T, P, S>
where
    T: Transport + ?Sized,
    P: SessionPrompts + ?Sized,
    S: TransactionStore + ?Sized + 'static,
{
    pub fn new(
        context: SessionContext,
        transport: &'a mut T,
        prompts: &'a P,
        store: Arc<S>,
        tx: &'a mut PendingTransaction,
    ) -> Self {
        let model = context.device_model;
        Self {
            context,
            transport,
            prompts,
            store,
            tx,
            state: SessionState::AwaitingAddress,
            model,
            data_offset: 0,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Device model in use, once known
    pub fn model(&self) -> Option<DeviceModel> {
        self.model
    }

    /// Run the exchange until the transaction is signed or the session is cancelled
    pub async fn run(&mut self) -> Result<SigningOutcome> {
        if self.state.is_terminal() {
            return Err(SigningError::SessionClosed);
        }

        if self.model.is_none() {
            let features = device::initialize(&mut *self.transport).await?;
            self.model = Some(DeviceModel::from_features(&features));
        }

        tracing::info!(
            "requesting address at {} for {:#x}",
            self.context.derivation_path,
            self.tx.from
        );
        self.transport
            .send(Message::EthereumGetAddress(EthereumGetAddress {
                address_n: self.context.derivation_path.address_n(),
                show_display: Some(self.context.show_display),
            }))
            .await?;

        loop {
            let message = self.transport.receive().await?;
            if let Step::Done(outcome) = self.handle_message(message).await? {
                return Ok(outcome);
            }
        }
    }

    /// Advance the state machine by one device message
    pub async fn handle_message(&mut self, message: Message) -> Result<Step> {
        tracing::trace!("{:?} <- {}", self.state, message.name());

        match (self.state, message) {
            (SessionState::Completed | SessionState::Cancelled, _) => Err(SigningError::SessionClosed),

            (_, Message::ButtonRequest(request)) => {
                self.prompts.button_request(request.code).await;
                self.transport.send(Message::ButtonAck(ButtonAck {})).await?;
                Ok(Step::Continue)
            }
            (_, Message::PinMatrixRequest(request)) => {
                match self.prompts.pin(PinKind::from_wire(request.r#type)).await {
                    Some(pin) => {
                        self.transport.send(Message::PinMatrixAck(PinMatrixAck { pin })).await?;
                        Ok(Step::Continue)
                    }
                    None => self.cancel_by_user().await,
                }
            }
            (_, Message::PassphraseRequest(_)) => match self.prompts.passphrase().await {
                Some(passphrase) => {
                    self.transport
                        .send(Message::PassphraseAck(PassphraseAck {
                            passphrase: Some(passphrase),
                        }))
                        .await?;
                    Ok(Step::Continue)
                }
                None => self.cancel_by_user().await,
            },
            (_, Message::Failure(failure)) => self.on_failure(failure),

            (SessionState::AwaitingAddress, Message::EthereumAddress(response)) => {
                let reported = decode_device_address(&response)?;
                self.on_address(reported).await
            }
            (SessionState::AwaitingAddress, other) => Err(SigningError::UnexpectedMessage {
                state: self.state,
                message_type: other.name(),
            }),

            (SessionState::ProcessingTask, Message::EthereumTxRequest(request)) => {
                self.on_tx_request(request).await
            }
            (SessionState::ProcessingTask, other) => {
                tracing::debug!("ignoring {} while waiting for the signature", other.name());
                Ok(Step::Continue)
            }
        }
    }

    async fn on_address(&mut self, reported: Address) -> Result<Step> {
        let expected = self.tx.from;
        if reported != expected {
            self.prompts.address_mismatch(reported, expected).await;
            self.state = SessionState::Cancelled;
            return Ok(Step::Done(SigningOutcome::Cancelled(CancelReason::AddressMismatch {
                reported,
                expected,
            })));
        }

        let model = self.model.unwrap_or(DeviceModel::Trezor);
        let request = build_sign_request(&*self.tx, &self.context.derivation_path, model)?;
        self.data_offset = request.initial_chunk_len();

        self.state = SessionState::ProcessingTask;
        tracing::info!("address verified, sending {} sign request", model);
        self.transport.send(request.into_message()).await?;
        Ok(Step::Continue)
    }

    async fn on_tx_request(&mut self, request: EthereumTxRequest) -> Result<Step> {
        if let Some(signature) = SignatureComponents::from_tx_request(&request)? {
            self.state = SessionState::Completed;
            let tx_hash = finalize(&mut *self.tx, signature, Arc::clone(&self.store)).await?;
            return Ok(Step::Done(SigningOutcome::Signed { tx_hash }));
        }

        let requested = request.data_length.unwrap_or(0) as usize;
        let end = self.data_offset.saturating_add(requested).min(self.tx.input.len());
        if requested == 0 || self.data_offset >= end {
            return Err(SigningError::Device {
                code: None,
                message: format!(
                    "device requested {} payload bytes at offset {} of {}",
                    requested,
                    self.data_offset,
                    self.tx.input.len()
                ),
            });
        }

        let chunk = self.tx.input[self.data_offset..end].to_vec();
        tracing::debug!("sending payload bytes {}..{}", self.data_offset, end);
        self.data_offset = end;
        self.transport
            .send(Message::EthereumTxAck(EthereumTxAck {
                data_chunk: Some(chunk),
            }))
            .await?;
        Ok(Step::Continue)
    }

    async fn cancel_by_user(&mut self) -> Result<Step> {
        tracing::info!("prompt dismissed, cancelling session");
        self.transport.send(Message::Cancel(Cancel {})).await?;
        self.state = SessionState::Cancelled;
        Ok(Step::Done(SigningOutcome::Cancelled(CancelReason::User)))
    }

    fn on_failure(&mut self, failure: Failure) -> Result<Step> {
        match failure.code {
            Some(failure_type::ACTION_CANCELLED) | Some(failure_type::PIN_CANCELLED) => {
                tracing::info!("cancelled on device: {}", failure.message.unwrap_or_default());
                self.state = SessionState::Cancelled;
                Ok(Step::Done(SigningOutcome::Cancelled(CancelReason::Device)))
            }
            code => Err(SigningError::Device {
                code,
                message: failure.message.unwrap_or_default(),
            }),
        }
    }
}
