use futures_util::{SinkExt, StreamExt};
use ldap3_proto::{
    LdapCodec, LdapResultCode,
    proto::{
        LdapCompareRequest, LdapModifyRequest, LdapModifyType, LdapMsg, LdapOp,
        LdapResult as LdapResultOp,
    },
};
use std::{
    collections::HashMap,
    net::SocketAddr,
    sync::{Arc, Mutex},
    time::Duration,
};
use tokio::{net::TcpListener, sync::mpsc};
use tokio_util::codec::{FramedRead, FramedWrite};

type Entries = HashMap<String, HashMap<String, Vec<Vec<u8>>>>;

/// A tiny in-memory directory. Requests on entries whose DN contains `slow` are answered
/// after a delay, so that replies come back out of order.
#[derive(Clone, Default)]
pub struct TestDirectory {
    entries: Arc<Mutex<Entries>>,
}

fn make_result(code: LdapResultCode, message: &str) -> LdapResultOp {
    LdapResultOp {
        code,
        matcheddn: "".to_string(),
        message: message.to_string(),
        referral: vec![],
    }
}

impl TestDirectory {
    /// Adds an entry, given as `(attribute, value)` pairs.
    pub fn with_entry(self, dn: &str, attributes: &[(&str, &str)]) -> Self {
        let mut entry: HashMap<String, Vec<Vec<u8>>> = HashMap::new();
        for (name, value) in attributes {
            entry
                .entry(name.to_ascii_lowercase())
                .or_default()
                .push(value.as_bytes().to_vec());
        }
        self.entries.lock().unwrap().insert(dn.to_string(), entry);
        self
    }

    pub fn values(&self, dn: &str, attribute: &str) -> Vec<String> {
        self.entries
            .lock()
            .unwrap()
            .get(dn)
            .and_then(|e| e.get(&attribute.to_ascii_lowercase()))
            .map(|values| {
                values
                    .iter()
                    .map(|v| String::from_utf8(v.clone()).unwrap())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn modify(&self, request: LdapModifyRequest) -> LdapResultOp {
        let mut entries = self.entries.lock().unwrap();
        let Some(entry) = entries.get_mut(&request.dn) else {
            return make_result(LdapResultCode::NoSuchObject, "");
        };
        let mut updated = entry.clone();
        for change in request.changes {
            let name = change.modification.atype.to_ascii_lowercase();
            let values = change.modification.vals;
            match change.operation {
                LdapModifyType::Add => {
                    let current = updated.entry(name).or_default();
                    for value in values {
                        if current.contains(&value) {
                            return make_result(
                                LdapResultCode::AttributeOrValueExists,
                                "value already present",
                            );
                        }
                        current.push(value);
                    }
                }
                LdapModifyType::Delete if values.is_empty() => {
                    if updated.remove(&name).is_none() {
                        return make_result(LdapResultCode::NoSuchAttribute, "");
                    }
                }
                LdapModifyType::Delete => {
                    let current = updated.entry(name.clone()).or_default();
                    current.retain(|v| !values.contains(v));
                    if current.is_empty() {
                        updated.remove(&name);
                    }
                }
                _ => {
                    if values.is_empty() {
                        updated.remove(&name);
                    } else {
                        updated.insert(name, values);
                    }
                }
            }
        }
        *entry = updated;
        make_result(LdapResultCode::Success, "")
    }

    fn compare(&self, request: LdapCompareRequest) -> LdapResultOp {
        let entries = self.entries.lock().unwrap();
        match entries.get(&request.dn) {
            None => make_result(LdapResultCode::NoSuchObject, ""),
            Some(entry) => match entry.get(&request.atype.to_ascii_lowercase()) {
                Some(values) if values.contains(&request.val) => {
                    make_result(LdapResultCode::CompareTrue, "")
                }
                _ => make_result(LdapResultCode::CompareFalse, ""),
            },
        }
    }

    fn handle(&self, op: LdapOp) -> Option<LdapOp> {
        match op {
            LdapOp::ModifyRequest(request) => Some(LdapOp::ModifyResponse(self.modify(request))),
            LdapOp::CompareRequest(request) => Some(LdapOp::CompareResult(self.compare(request))),
            _ => None,
        }
    }

    /// Serves a single client connection on a random local port.
    pub async fn serve(self) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let (r, w) = stream.into_split();
            let mut requests = FramedRead::new(r, LdapCodec::default());
            let mut replies = FramedWrite::new(w, LdapCodec::default());
            let (sender, mut receiver) = mpsc::unbounded_channel::<LdapMsg>();
            tokio::spawn(async move {
                while let Some(msg) = receiver.recv().await {
                    if replies.send(msg).await.is_err() {
                        break;
                    }
                }
            });
            while let Some(Ok(msg)) = requests.next().await {
                if msg.op == LdapOp::UnbindRequest {
                    break;
                }
                let directory = self.clone();
                let sender = sender.clone();
                tokio::spawn(async move {
                    let slow = match &msg.op {
                        LdapOp::ModifyRequest(r) => r.dn.contains("slow"),
                        LdapOp::CompareRequest(r) => r.dn.contains("slow"),
                        _ => false,
                    };
                    if slow {
                        tokio::time::sleep(Duration::from_millis(200)).await;
                    }
                    if let Some(op) = directory.handle(msg.op) {
                        let _ = sender.send(LdapMsg {
                            msgid: msg.msgid,
                            op,
                            ctrl: vec![],
                        });
                    }
                });
            }
        });
        address
    }
}
