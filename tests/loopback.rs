//! End-to-end transfers between two engines over in-memory streams.

use framelink::mock::{MockTimer, StreamMock};
use framelink::{Config, CrcRegister, TransferLayer};

type Link<W, const N: usize> = TransferLayer<W, StreamMock, MockTimer, N, N>;

fn link<W, const N: usize>() -> Link<W, N>
where
    W: CrcRegister,
    Config<W>: Default,
{
    TransferLayer::new(StreamMock::new(), MockTimer::new(1_000), Config::default())
}

/// Moves a sent frame from `tx` onto `rx`'s receive side, dropping the
/// outbound-only payload length byte.
fn wire<W, const N: usize>(tx: &mut Link<W, N>, rx: &mut Link<W, N>)
where
    W: CrcRegister,
{
    let frame = tx.stream().transmitted().to_vec();
    tx.stream_mut().flush();
    rx.stream_mut().feed(&frame[..1]);
    rx.stream_mut().feed(&frame[2..]);
}

#[test]
fn controller_to_host_and_back() {
    let mut controller: Link<u16, 258> = link();
    let mut host: Link<u16, 258> = link();

    let telemetry = [0u8, 129, 0, 0, 42, 17, 255, 0, 3];
    controller.write_payload(&telemetry, 0).unwrap();
    controller.send().unwrap();
    wire(&mut controller, &mut host);

    host.receive().unwrap();
    assert_eq!(host.bytes_in_rx(), telemetry.len());
    let mut received = [0u8; 9];
    host.read_payload(&mut received, 0).unwrap();
    assert_eq!(received, telemetry);

    // Reply the other way on the same pair.
    let command = [7u8, 7, 7];
    host.write_payload(&command, 0).unwrap();
    host.send().unwrap();
    wire(&mut host, &mut controller);

    controller.receive().unwrap();
    let mut received = [0u8; 3];
    controller.read_payload(&mut received, 0).unwrap();
    assert_eq!(received, command);
}

#[test]
fn back_to_back_frames_parse_individually() {
    let mut tx: Link<u16, 258> = link();
    let mut rx: Link<u16, 258> = link();

    for (index, payload) in [&[1u8, 0, 1][..], &[2, 2][..], &[0, 0, 0, 3][..]]
        .into_iter()
        .enumerate()
    {
        tx.write_payload(payload, 0).unwrap();
        tx.send().unwrap();
        wire(&mut tx, &mut rx);

        rx.receive().unwrap();
        assert_eq!(rx.bytes_in_rx(), payload.len(), "frame {}", index);
        let mut received = vec![0u8; payload.len()];
        rx.read_payload(&mut received, 0).unwrap();
        assert_eq!(&received[..], payload, "frame {}", index);
    }
}

#[test]
fn all_crc_widths_interoperate_with_themselves() {
    let payload = [10u8, 0, 0, 20, 0, 0, 0, 143, 12, 54];

    let mut tx: Link<u8, 257> = link();
    let mut rx: Link<u8, 257> = link();
    tx.write_payload(&payload, 0).unwrap();
    tx.send().unwrap();
    wire(&mut tx, &mut rx);
    rx.receive().unwrap();
    let mut received = [0u8; 10];
    rx.read_payload(&mut received, 0).unwrap();
    assert_eq!(received, payload);

    let mut tx: Link<u32, 260> = link();
    let mut rx: Link<u32, 260> = link();
    tx.write_payload(&payload, 0).unwrap();
    tx.send().unwrap();
    wire(&mut tx, &mut rx);
    rx.receive().unwrap();
    let mut received = [0u8; 10];
    rx.read_payload(&mut received, 0).unwrap();
    assert_eq!(received, payload);
}

#[test]
fn asymmetric_buffer_sizes() {
    // A controller with small buffers talking to a full-size host.
    let mut controller: TransferLayer<u16, StreamMock, MockTimer, 36, 36> =
        TransferLayer::new(StreamMock::new(), MockTimer::new(1_000), Config::default());
    let mut host: Link<u16, 258> = link();
    assert_eq!(controller.max_tx_payload(), 32);

    let payload: Vec<u8> = (0..32u8).collect();
    controller.write_payload(&payload, 0).unwrap();
    controller.send().unwrap();

    let frame = controller.stream().transmitted().to_vec();
    host.stream_mut().feed(&frame[..1]);
    host.stream_mut().feed(&frame[2..]);
    host.receive().unwrap();

    let mut received = vec![0u8; 32];
    host.read_payload(&mut received, 0).unwrap();
    assert_eq!(received, payload);
}
