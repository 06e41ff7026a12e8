use bytes::{BufMut, BytesMut};
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::http::response::ResponseHead;

const HTTP_VERSION: &str = "HTTP/1.1";

/// Serializes a head into its exact wire form, terminated by the blank line.
pub fn serialize_head(head: &ResponseHead) -> BytesMut {
    let mut buf = BytesMut::with_capacity(128);

    buf.put_slice(
        format!(
            "{} {} {}\r\n",
            HTTP_VERSION,
            head.status.as_u16(),
            head.status.reason_phrase()
        )
        .as_bytes(),
    );

    for (k, v) in &head.headers {
        buf.put_slice(k.as_bytes());
        buf.put_slice(b": ");
        buf.put_slice(v.as_bytes());
        buf.put_slice(b"\r\n");
    }

    buf.put_slice(b"\r\n");
    buf
}

/// Sends a head and waits until every byte of it has been written.
pub async fn write_head<W>(stream: &mut W, head: &ResponseHead) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let buf = serialize_head(head);
    stream.write_all(&buf).await?;
    stream.flush().await
}
