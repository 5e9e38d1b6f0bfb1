use futures_util::{SinkExt, StreamExt};
use ldap3_proto::{
    LdapCodec, LdapResultCode,
    proto::{LdapExtendedResponse, LdapMsg, LdapOp, LdapResult as LdapResultOp},
};
use tokio::io::{DuplexStream, ReadHalf, WriteHalf};
use tokio_util::codec::{FramedRead, FramedWrite};

pub fn make_result(code: LdapResultCode, message: &str) -> LdapResultOp {
    LdapResultOp {
        code,
        matcheddn: "".to_string(),
        message: message.to_string(),
        referral: vec![],
    }
}

/// Server end of an in-memory connection, driven by the test.
pub struct FakeServer {
    requests: FramedRead<ReadHalf<DuplexStream>, LdapCodec>,
    replies: FramedWrite<WriteHalf<DuplexStream>, LdapCodec>,
}

impl FakeServer {
    pub fn new(stream: DuplexStream) -> Self {
        let (r, w) = tokio::io::split(stream);
        Self {
            requests: FramedRead::new(r, LdapCodec::default()),
            replies: FramedWrite::new(w, LdapCodec::default()),
        }
    }

    pub async fn next_request(&mut self) -> LdapMsg {
        self.requests
            .next()
            .await
            .expect("client hung up")
            .expect("invalid request")
    }

    pub async fn reply(&mut self, msgid: i32, op: LdapOp) {
        self.replies
            .send(LdapMsg {
                msgid,
                op,
                ctrl: vec![],
            })
            .await
            .expect("could not send reply");
    }

    /// Answers the next request with the given result.
    pub async fn answer(
        &mut self,
        make_op: impl FnOnce(LdapResultOp) -> LdapOp,
        code: LdapResultCode,
        message: &str,
    ) -> LdapMsg {
        let request = self.next_request().await;
        self.reply(request.msgid, make_op(make_result(code, message)))
            .await;
        request
    }

    pub async fn notice_of_disconnection(&mut self) {
        self.reply(
            0,
            LdapOp::ExtendedResponse(LdapExtendedResponse {
                res: make_result(LdapResultCode::Other, "server shutting down"),
                name: Some("1.3.6.1.4.1.1466.20036".to_string()),
                value: None,
            }),
        )
        .await;
    }
}
