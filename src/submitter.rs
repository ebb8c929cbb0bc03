//! Response Submitter.
//!
//! Signs `"Respond domain task {index}"` (keccak256, raw signature, no EIP-191
//! prefix) and sends `respondToTask` to the task contract with a fixed gas
//! ceiling. A revert or a missed confirmation is a failure for that task only.

use crate::error::SubmissionError;
use crate::task::{respondToTaskCall, Task, TxHandle, ValuationResult};
use crate::utils::constants::RESPONSE_MESSAGE_PREFIX;
use crate::utils::rpc::HttpProvider;
use alloy::eips::eip2718::Encodable2718;
use alloy::network::{EthereumWallet, TransactionBuilder};
use alloy::primitives::{keccak256, Address, Bytes, B256};
use alloy::providers::Provider;
use alloy::rpc::types::eth::TransactionRequest;
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::Signer;
use alloy::sol_types::SolCall;
use async_trait::async_trait;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

#[async_trait]
pub trait ResponseSubmitter: Send + Sync {
    async fn submit(
        &self,
        task: &Task,
        valuation: &ValuationResult,
    ) -> Result<TxHandle, SubmissionError>;
}

pub fn response_message(task: &Task) -> String {
    format!("{RESPONSE_MESSAGE_PREFIX} {}", task.index)
}

pub fn response_message_hash(task: &Task) -> B256 {
    keccak256(response_message(task).as_bytes())
}

/// Raw 65-byte signature over the message hash.
pub async fn sign_response(
    signer: &PrivateKeySigner,
    task: &Task,
) -> Result<Bytes, SubmissionError> {
    let hash = response_message_hash(task);
    let signature = signer
        .sign_hash(&hash)
        .await
        .map_err(|e| SubmissionError::Signing(e.to_string()))?;
    Ok(Bytes::from(signature.as_bytes().to_vec()))
}

pub fn encode_response_call(
    task: &Task,
    valuation: &ValuationResult,
    signature: Bytes,
) -> Result<Vec<u8>, SubmissionError> {
    let reference = u32::try_from(task.index.0)
        .map_err(|_| SubmissionError::TaskIndexOverflow(task.index.0))?;
    Ok(respondToTaskCall {
        task: task.payload.clone(),
        score: valuation.onchain_score(),
        evidenceUri: valuation.evidence_uri.clone(),
        referenceTaskIndex: reference,
        signature,
    }
    .abi_encode())
}

/// Maps the confirmation wait to the task's fate. `receipt` carries the
/// receipt status, or the reason no receipt arrived.
pub fn settle_receipt<E: std::fmt::Display>(
    tx_hash: B256,
    receipt: Result<bool, E>,
) -> Result<TxHandle, SubmissionError> {
    match receipt {
        Ok(true) => Ok(TxHandle(tx_hash)),
        Ok(false) => Err(SubmissionError::Reverted {
            tx_hash: format!("{tx_hash:#x}"),
        }),
        Err(e) => Err(SubmissionError::Confirmation(format!("tx {tx_hash:#x}: {e}"))),
    }
}

pub fn parse_operator_key(raw: &str) -> Result<PrivateKeySigner, SubmissionError> {
    let clean = raw.trim().trim_start_matches("0x");
    PrivateKeySigner::from_str(clean)
        .map_err(|e| SubmissionError::Signing(format!("invalid operator key: {e}")))
}

pub struct AlloyResponseSubmitter {
    provider: Arc<HttpProvider>,
    signer: PrivateKeySigner,
    wallet: EthereumWallet,
    task_contract: Address,
    chain_id: u64,
    gas_limit: u64,
    receipt_timeout: Duration,
}

impl AlloyResponseSubmitter {
    pub fn new(
        provider: Arc<HttpProvider>,
        signer: PrivateKeySigner,
        task_contract: Address,
        chain_id: u64,
        gas_limit: u64,
        receipt_timeout: Duration,
    ) -> Self {
        let wallet = EthereumWallet::from(signer.clone());
        Self {
            provider,
            signer,
            wallet,
            task_contract,
            chain_id,
            gas_limit,
            receipt_timeout,
        }
    }

    pub fn operator_address(&self) -> Address {
        self.signer.address()
    }
}

#[async_trait]
impl ResponseSubmitter for AlloyResponseSubmitter {
    async fn submit(
        &self,
        task: &Task,
        valuation: &ValuationResult,
    ) -> Result<TxHandle, SubmissionError> {
        let signature = sign_response(&self.signer, task).await?;
        let calldata = encode_response_call(task, valuation, signature)?;

        let from = self.signer.address();
        let nonce = self
            .provider
            .get_transaction_count(from)
            .pending()
            .await
            .map_err(|e| SubmissionError::Transport(format!("eth_getTransactionCount: {e}")))?;
        let fees = self
            .provider
            .estimate_eip1559_fees(None)
            .await
            .map_err(|e| SubmissionError::Transport(format!("fee estimation: {e}")))?;

        let mut tx = TransactionRequest::default()
            .with_to(self.task_contract)
            .with_input(calldata)
            .with_chain_id(self.chain_id)
            .with_nonce(nonce)
            .with_gas_limit(self.gas_limit)
            .with_max_fee_per_gas(fees.max_fee_per_gas)
            .with_max_priority_fee_per_gas(fees.max_priority_fee_per_gas);
        tx.from = Some(from);
        let signed = tx
            .build(&self.wallet)
            .await
            .map_err(|e| SubmissionError::Signing(format!("transaction signing failed: {e}")))?;

        let pending = self
            .provider
            .send_raw_transaction(&signed.encoded_2718())
            .await
            .map_err(|e| SubmissionError::Transport(format!("eth_sendRawTransaction: {e}")))?;
        let tx_hash = *pending.tx_hash();
        tracing::info!(
            "[SUBMIT] task {} response sent tx={:#x} nonce={} gas_limit={}",
            task.index,
            tx_hash,
            nonce,
            self.gas_limit
        );

        let receipt = pending
            .with_required_confirmations(1)
            .with_timeout(Some(self.receipt_timeout))
            .get_receipt()
            .await
            .map(|receipt| receipt.status());
        settle_receipt(tx_hash, receipt)
    }
}
