use tracing::{debug, info, warn};

use crate::at;
use crate::buffer::Allocator;
use crate::command::{CommandSpec, Form, Param};
use crate::engine::{classify, contains, Modem};
use crate::error::{Result, SaraError};
use crate::parser::{parse_operators, parse_pdp_contexts};
use crate::transport::Transport;
use crate::types::{NetworkMode, OperatorStats, PdpAction, PdpContext, PdpType};

const PSD_ACTION: CommandSpec = CommandSpec::new(
    at::PSD_ACTION,
    Form::Set,
    &[Param::Int { digits: 1 }, Param::Int { digits: 1 }],
);
const NETWORK_MODE: CommandSpec = CommandSpec::new(
    at::OPERATOR_SELECTION,
    Form::Set,
    &[Param::Int { digits: 1 }],
);
const AUTOMATIC_SELECTION: CommandSpec = CommandSpec::new(
    at::OPERATOR_SELECTION,
    Form::Set,
    &[Param::Int { digits: 1 }, Param::Int { digits: 1 }],
);
const OPERATOR_SCAN: CommandSpec =
    CommandSpec::new(at::OPERATOR_SELECTION, Form::Test, &[]);
const PDP_READ: CommandSpec = CommandSpec::new(at::PDP_CONTEXT, Form::Read, &[]);
const PDP_DEFINE: CommandSpec = CommandSpec::new(
    at::PDP_CONTEXT,
    Form::Set,
    &[
        Param::Int { digits: 3 },
        Param::Text {
            max: at::PDP_TYPE_LEN,
        },
        Param::Text { max: at::APN_LEN },
    ],
);

impl<T: Transport, A: Allocator> Modem<T, A> {
    /// Runs a packet switched data action on `profile`.
    ///
    /// Deactivating a profile that is not active fails with
    /// [`SaraError::Error`]; callers usually treat that as a warning.
    pub fn perform_pdp_action(
        &mut self,
        profile: u8,
        action: PdpAction,
        response: &mut [u8],
    ) -> Result<()> {
        self.execute(
            &PSD_ACTION,
            &[profile.into(), action.code().into()],
            at::OK,
            response,
            at::MEDIUM_TIMEOUT,
        )?;
        debug!(profile, ?action, "PDP action done");
        Ok(())
    }

    pub fn set_network_mode(
        &mut self,
        mode: NetworkMode,
        response: &mut [u8],
    ) -> Result<()> {
        self.execute(
            &NETWORK_MODE,
            &[mode.code().into()],
            at::OK,
            response,
            at::MEDIUM_TIMEOUT,
        )?;
        Ok(())
    }

    /// Registers on the network with automatic operator selection.
    pub fn automatic_operator_selection(
        &mut self,
        response: &mut [u8],
    ) -> Result<()> {
        self.execute(
            &AUTOMATIC_SELECTION,
            &[NetworkMode::Automatic.code().into(), 0u8.into()],
            at::OK,
            response,
            at::OPERATOR_SCAN_TIMEOUT,
        )?;
        Ok(())
    }

    /// Scans for operators and returns at most `max` of them.
    ///
    /// Automatic selection is requested first; its modem-side outcome is only
    /// logged.
    pub fn get_operators(&mut self, max: usize) -> Result<Vec<OperatorStats>> {
        let command = self.command(&OPERATOR_SCAN, &[])?;
        let len = max
            .checked_add(1)
            .and_then(|n| n.checked_mul(at::OPERATOR_RESPONSE_SLOT))
            .ok_or(SaraError::OutOfMemory)?;
        let mut response = self.response_buffer(len)?;

        match self.automatic_operator_selection(&mut response) {
            Ok(()) => {}
            Err(e @ (SaraError::OutOfMemory | SaraError::Transport(_))) => {
                return Err(e);
            }
            Err(e) => warn!(error = %e, "Automatic operator selection failed"),
        }

        let exchange = self.send_with_response(
            command.as_bytes(),
            at::OK,
            &mut response,
            at::OPERATOR_SCAN_TIMEOUT,
        )?;
        let received = classify(exchange, &response)?;

        let operators = parse_operators(&response[..received], max);
        info!(count = operators.len(), "Operator scan complete");
        Ok(operators)
    }

    /// Reads the defined PDP contexts. The first one is the active context.
    ///
    /// A reply is parsed even without a final `OK`, so a truncated response
    /// still yields whatever contexts it carries.
    pub fn get_apn(&mut self) -> Result<Vec<PdpContext>> {
        let command = self.command(&PDP_READ, &[])?;
        let mut response = self.response_buffer(at::LARGE_RESPONSE_SIZE)?;

        let exchange = self.send_with_response(
            command.as_bytes(),
            at::OK,
            &mut response,
            at::SHORT_TIMEOUT,
        )?;
        let received = &response[..exchange.received];
        if !exchange.matched && contains(received, at::ERROR) {
            warn!("Modem returned ERROR for PDP context read");
            return Err(SaraError::Error);
        }

        parse_pdp_contexts(received, at::MAX_PDP_CONTEXTS)
    }

    /// Defines PDP context `cid` with the given type and access point name.
    pub fn set_apn(
        &mut self,
        cid: u8,
        pdp_type: PdpType,
        apn: &str,
        response: &mut [u8],
    ) -> Result<()> {
        let pdp_type = pdp_type
            .as_wire()
            .ok_or(SaraError::UnexpectedParam("pdp type"))?;
        self.execute(
            &PDP_DEFINE,
            &[cid.into(), pdp_type.into(), apn.into()],
            at::OK,
            response,
            at::MEDIUM_TIMEOUT,
        )?;
        info!(cid, pdp_type, apn, "PDP context defined");
        Ok(())
    }
}
