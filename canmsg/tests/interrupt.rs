use canmsg::core::{DataLength, FrameKind, Id, MAX_DATA_LENGTH};
use canmsg::driver::frame::{Data, Frame};
use canmsg::driver::loopback::Loopback;
use canmsg::{Error, RxMessage, TxMessage};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use std::thread;
use std::vec::Vec;

type Bus = Loopback<CriticalSectionRawMutex, 4>;

const FRAME_COUNT: usize = 500;

fn id() -> Id {
    Id::new(0x42, FrameKind::Standard).unwrap()
}

#[test]
fn test_drain_never_sees_torn_frame() {
    let bus = Bus::new();
    let rx = RxMessage::<CriticalSectionRawMutex, _>::new(id(), DataLength::MAX, &bus);

    let received = thread::scope(|s| {
        // Plays the receive interrupt: every frame is fetched as soon as the buffer is drained
        s.spawn(|| {
            for k in 0..FRAME_COUNT {
                let data = Data::new(&[k as u8; MAX_DATA_LENGTH]).unwrap();
                bus.inject(Frame::new_data(id(), data)).unwrap();
                loop {
                    match rx.check_for_new_frame() {
                        Ok(()) => break,
                        Err(Error::ReceivedDataStillBuffered) => thread::yield_now(),
                        Err(error) => panic!("unexpected error {error}"),
                    }
                }
            }
        });

        let consumer = s.spawn(|| {
            let mut frames = Vec::new();
            while frames.len() < FRAME_COUNT {
                if !rx.has_data() {
                    thread::yield_now();
                    continue;
                }
                let mut frame = [0u8; MAX_DATA_LENGTH];
                for byte in frame.iter_mut() {
                    *byte = rx.next_byte();
                }
                frames.push(frame);
            }
            frames
        });

        consumer.join().unwrap()
    });

    assert_eq!(received.len(), FRAME_COUNT);
    for (k, frame) in received.iter().enumerate() {
        assert_eq!(*frame, [k as u8; MAX_DATA_LENGTH]);
    }
    assert!(!rx.has_data());
    assert_eq!(bus.queued(), 0);
}

#[test]
fn test_fill_from_many_contexts() {
    let bus = Bus::new();
    let tx = TxMessage::<CriticalSectionRawMutex, _>::new(id(), DataLength::MAX, &bus);

    thread::scope(|s| {
        for slot in 0..MAX_DATA_LENGTH {
            let tx = &tx;
            s.spawn(move || tx.set_byte(slot as u8 * 3, slot).unwrap());
        }
    });
    assert!(tx.is_ready_to_send());

    let results: Vec<_> = thread::scope(|s| {
        let handles: Vec<_> = (0..4).map(|_| s.spawn(|| tx.send())).collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    // exactly one sender wins, the rest find the message emptied
    assert_eq!(results.iter().filter(|res| res.is_ok()).count(), 1);
    assert!(
        results
            .iter()
            .filter_map(|res| res.err())
            .all(|error| error == Error::MessageNotComplete)
    );
    let frame = bus.pop_frame().unwrap();
    assert_eq!(frame.data.as_ref(), [0, 3, 6, 9, 12, 15, 18, 21]);
}
