//! zkSync EIP-712 (type `0x71`) transactions.
//!
//! A sponsored write is a native zkSync transaction carrying paymaster
//! params. The wallet signs the transaction's typed-data form with
//! `eth_signTypedData_v4`; the signature then travels inside the RLP body
//! as the `customSignature` field.

use alloy_primitives::{Address, B256, Bytes, U256, hex};
use alloy_rlp::{BufMut, Encodable, Header};
use alloy_sol_types::{Eip712Domain, SolCall, SolStruct, sol};
use deworld::chain::ChainId;
use deworld::client::{SponsorshipKind, SponsorshipParams};
use serde_json::json;

use crate::contract::IPaymasterFlow;

/// Transaction type byte for zkSync EIP-712 transactions.
pub const EIP712_TX_TYPE: u8 = 0x71;

sol! {
    /// Typed-data struct signed by the wallet.
    ///
    /// Addresses are widened to `uint256`, as zkSync defines it.
    #[allow(missing_docs)]
    #[derive(Debug)]
    struct Transaction {
        uint256 txType;
        uint256 from;
        uint256 to;
        uint256 gasLimit;
        uint256 gasPerPubdataByteLimit;
        uint256 maxFeePerGas;
        uint256 maxPriorityFeePerGas;
        uint256 paymaster;
        uint256 nonce;
        uint256 value;
        bytes data;
        bytes32[] factoryDeps;
        bytes paymasterInput;
    }
}

/// Paymaster address plus the flow-encoded input it receives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymasterParams {
    /// Paymaster contract.
    pub paymaster: Address,
    /// ABI-encoded `IPaymasterFlow` call.
    pub input: Bytes,
}

impl PaymasterParams {
    /// Approval-based flow: the paymaster pulls `min_allowance` of `token`
    /// as the fee.
    #[must_use]
    pub fn approval_based(
        paymaster: Address,
        token: Address,
        min_allowance: U256,
        inner_input: Bytes,
    ) -> Self {
        let input = IPaymasterFlow::approvalBasedCall {
            _token: token,
            _minAllowance: min_allowance,
            _innerInput: inner_input,
        }
        .abi_encode();
        Self {
            paymaster,
            input: input.into(),
        }
    }

    /// General flow: the paymaster decides on its own whether to sponsor.
    #[must_use]
    pub fn general(paymaster: Address, inner_input: Bytes) -> Self {
        let input = IPaymasterFlow::generalCall { input: inner_input }.abi_encode();
        Self {
            paymaster,
            input: input.into(),
        }
    }
}

impl From<&SponsorshipParams> for PaymasterParams {
    fn from(params: &SponsorshipParams) -> Self {
        match params.kind {
            SponsorshipKind::ApprovalBased => Self::approval_based(
                params.paymaster,
                params.fee_token,
                params.min_allowance,
                params.inner_input.clone(),
            ),
            SponsorshipKind::General => Self::general(params.paymaster, params.inner_input.clone()),
        }
    }
}

/// An unsigned zkSync EIP-712 transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Eip712Transaction {
    /// Chain the transaction is bound to.
    pub chain_id: ChainId,
    /// Sender nonce.
    pub nonce: u64,
    /// Sender.
    pub from: Address,
    /// Call target.
    pub to: Address,
    /// Gas limit.
    pub gas_limit: u64,
    /// `gasPerPubdataByteLimit`.
    pub gas_per_pubdata: u64,
    /// Max fee per gas, in wei.
    pub max_fee_per_gas: u128,
    /// Max priority fee per gas, in wei.
    pub max_priority_fee_per_gas: u128,
    /// Native value attached.
    pub value: U256,
    /// Calldata.
    pub data: Bytes,
    /// Fee sponsorship, if any.
    pub paymaster: Option<PaymasterParams>,
}

fn widen(address: Address) -> U256 {
    U256::from_be_slice(address.as_slice())
}

impl Eip712Transaction {
    /// The `zkSync` v2 signing domain for this chain.
    #[must_use]
    pub fn domain(&self) -> Eip712Domain {
        Eip712Domain::new(
            Some("zkSync".into()),
            Some("2".into()),
            Some(U256::from(self.chain_id.as_u64())),
            None,
            None,
        )
    }

    fn typed_struct(&self) -> Transaction {
        let (paymaster, paymaster_input) = self
            .paymaster
            .as_ref()
            .map_or((U256::ZERO, Bytes::new()), |p| {
                (widen(p.paymaster), p.input.clone())
            });
        Transaction {
            txType: U256::from(EIP712_TX_TYPE),
            from: widen(self.from),
            to: widen(self.to),
            gasLimit: U256::from(self.gas_limit),
            gasPerPubdataByteLimit: U256::from(self.gas_per_pubdata),
            maxFeePerGas: U256::from(self.max_fee_per_gas),
            maxPriorityFeePerGas: U256::from(self.max_priority_fee_per_gas),
            paymaster,
            nonce: U256::from(self.nonce),
            value: self.value,
            data: self.data.clone(),
            factoryDeps: Vec::new(),
            paymasterInput: paymaster_input,
        }
    }

    /// EIP-712 digest the wallet signs.
    #[must_use]
    pub fn signing_hash(&self) -> B256 {
        self.typed_struct().eip712_signing_hash(&self.domain())
    }

    /// The `eth_signTypedData_v4` payload for this transaction.
    #[must_use]
    pub fn typed_data(&self) -> serde_json::Value {
        let tx = self.typed_struct();
        json!({
            "types": {
                "EIP712Domain": [
                    { "name": "name", "type": "string" },
                    { "name": "version", "type": "string" },
                    { "name": "chainId", "type": "uint256" },
                ],
                "Transaction": [
                    { "name": "txType", "type": "uint256" },
                    { "name": "from", "type": "uint256" },
                    { "name": "to", "type": "uint256" },
                    { "name": "gasLimit", "type": "uint256" },
                    { "name": "gasPerPubdataByteLimit", "type": "uint256" },
                    { "name": "maxFeePerGas", "type": "uint256" },
                    { "name": "maxPriorityFeePerGas", "type": "uint256" },
                    { "name": "paymaster", "type": "uint256" },
                    { "name": "nonce", "type": "uint256" },
                    { "name": "value", "type": "uint256" },
                    { "name": "data", "type": "bytes" },
                    { "name": "factoryDeps", "type": "bytes32[]" },
                    { "name": "paymasterInput", "type": "bytes" },
                ],
            },
            "primaryType": "Transaction",
            "domain": {
                "name": "zkSync",
                "version": "2",
                "chainId": self.chain_id.as_u64(),
            },
            "message": {
                "txType": tx.txType.to_string(),
                "from": tx.from.to_string(),
                "to": tx.to.to_string(),
                "gasLimit": tx.gasLimit.to_string(),
                "gasPerPubdataByteLimit": tx.gasPerPubdataByteLimit.to_string(),
                "maxFeePerGas": tx.maxFeePerGas.to_string(),
                "maxPriorityFeePerGas": tx.maxPriorityFeePerGas.to_string(),
                "paymaster": tx.paymaster.to_string(),
                "nonce": tx.nonce.to_string(),
                "value": tx.value.to_string(),
                "data": hex::encode_prefixed(&tx.data),
                "factoryDeps": [],
                "paymasterInput": hex::encode_prefixed(&tx.paymasterInput),
            },
        })
    }

    /// Serializes the transaction with `signature` as its custom signature,
    /// ready for `eth_sendRawTransaction`.
    #[must_use]
    pub fn encode_signed(&self, signature: &Bytes) -> Bytes {
        let chain_id = self.chain_id.as_u64();
        let empty = Bytes::new();
        let factory_deps: Vec<B256> = Vec::new();
        let paymaster_fields: Vec<&dyn Encodable> = self
            .paymaster
            .as_ref()
            .map_or_else(Vec::new, |p| vec![&p.paymaster as &dyn Encodable, &p.input]);
        let paymaster = RlpList(&paymaster_fields);
        let fields: [&dyn Encodable; 16] = [
            &self.nonce,
            &self.max_priority_fee_per_gas,
            &self.max_fee_per_gas,
            &self.gas_limit,
            &self.to,
            &self.value,
            &self.data,
            // Unsigned legacy slot: chainId, r, s.
            &chain_id,
            &empty,
            &empty,
            &chain_id,
            &self.from,
            &self.gas_per_pubdata,
            &factory_deps,
            signature,
            &paymaster,
        ];
        let body = RlpList(&fields);
        let mut out = Vec::with_capacity(body.length() + 1);
        out.push(EIP712_TX_TYPE);
        body.encode(&mut out);
        out.into()
    }
}

/// Heterogeneous RLP list.
struct RlpList<'a>(&'a [&'a dyn Encodable]);

impl RlpList<'_> {
    fn payload_length(&self) -> usize {
        self.0.iter().map(|field| field.length()).sum()
    }
}

impl Encodable for RlpList<'_> {
    fn encode(&self, out: &mut dyn BufMut) {
        Header {
            list: true,
            payload_length: self.payload_length(),
        }
        .encode(out);
        for field in self.0 {
            field.encode(out);
        }
    }

    fn length(&self) -> usize {
        let payload_length = self.payload_length();
        Header {
            list: true,
            payload_length,
        }
        .length()
            + payload_length
    }
}
