//! In-memory `ChainClient` double for unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use stake_protocol::{bytes_to_address, Address};

use crate::error::ClientError;
use crate::rpc::{ChainClient, MemcmpFilter};

pub(crate) struct MockClient {
    pub accounts: Mutex<HashMap<Address, Vec<u8>>>,
    pub submitted: Mutex<Vec<Vec<u8>>>,
    pub filter_calls: Mutex<Vec<Vec<MemcmpFilter>>>,
    pub now: i64,
    pub fail_submit: bool,
    pub fail_confirm: bool,
    signature_counter: AtomicUsize,
}

impl MockClient {
    pub fn new(now: i64) -> Self {
        MockClient {
            accounts: Mutex::new(HashMap::new()),
            submitted: Mutex::new(Vec::new()),
            filter_calls: Mutex::new(Vec::new()),
            now,
            fail_submit: false,
            fail_confirm: false,
            signature_counter: AtomicUsize::new(0),
        }
    }

    pub fn insert_account(&self, address: Address, bytes: Vec<u8>) {
        self.accounts.lock().unwrap().insert(address, bytes);
    }
}

impl ChainClient for MockClient {
    fn fetch_account_bytes(&self, address: &Address) -> Result<Vec<u8>, ClientError> {
        self.accounts
            .lock()
            .unwrap()
            .get(address)
            .cloned()
            .ok_or_else(|| ClientError::AccountNotFound {
                address: bytes_to_address(address),
            })
    }

    fn latest_blockhash(&self) -> Result<[u8; 32], ClientError> {
        Ok([0x07; 32])
    }

    fn current_time(&self) -> Result<i64, ClientError> {
        Ok(self.now)
    }

    fn submit_signed(&self, wire: &[u8]) -> Result<String, ClientError> {
        if self.fail_submit {
            return Err(ClientError::Submission("blockhash expired".into()));
        }
        self.submitted.lock().unwrap().push(wire.to_vec());
        let n = self.signature_counter.fetch_add(1, Ordering::SeqCst);
        Ok(format!("sig-{n}"))
    }

    fn await_confirmation(&self, signature: &str) -> Result<(), ClientError> {
        if self.fail_confirm {
            return Err(ClientError::ConfirmationTimeout {
                signature: signature.to_string(),
            });
        }
        Ok(())
    }

    fn accounts_by_filter(
        &self,
        _program_id: &Address,
        filters: &[MemcmpFilter],
    ) -> Result<Vec<(Address, Vec<u8>)>, ClientError> {
        self.filter_calls.lock().unwrap().push(filters.to_vec());

        let accounts = self.accounts.lock().unwrap();
        Ok(accounts
            .iter()
            .filter(|(_, data)| {
                filters.iter().all(|f| {
                    data.len() >= f.offset + f.bytes.len()
                        && data[f.offset..f.offset + f.bytes.len()] == f.bytes[..]
                })
            })
            .map(|(address, data)| (*address, data.clone()))
            .collect())
    }
}
