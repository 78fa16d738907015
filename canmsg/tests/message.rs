use canmsg::driver::loopback::Loopback;
use canmsg::{Error, InitError, Message};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use static_cell::StaticCell;

type Bus = Loopback<CriticalSectionRawMutex, 4>;

static BUS: StaticCell<Bus> = StaticCell::new();

#[test]
fn test_static_messages() {
    let bus: &'static Bus = BUS.init(Bus::new());
    let mut request = Message::<CriticalSectionRawMutex, Bus>::new();
    let mut reply = Message::<CriticalSectionRawMutex, Bus>::new();
    let mut inbox = Message::<CriticalSectionRawMutex, Bus>::new();

    assert_eq!(request.send(), Err(Error::NotInitialized));
    assert_eq!(request.last_error().map(|e| e.code()), Some(0x1000));

    // remote request on a receive message
    assert_eq!(
        inbox.init(0x100, 3, true, 0, 0, bus),
        Err(Error::Init(InitError::RemoteRequestNotAllowed))
    );
    assert_eq!(inbox.last_error().map(|e| e.code()), Some(0xF500));

    request.init(0x100, 3, true, 0, 1, bus).unwrap();
    reply.init(0x100, 3, false, 0, 1, bus).unwrap();
    inbox.init(0x100, 3, false, 0, 0, bus).unwrap();
    assert_eq!(inbox.last_error(), None);

    request.send().unwrap();
    assert_eq!(reply.check_remote_request_received(), Ok(true));

    for (slot, byte) in [0x10, 0x20, 0x30].into_iter().enumerate() {
        reply.set_byte(byte, slot).unwrap();
    }
    let res = inbox.set_byte(0, 0);
    assert_eq!(res, Err(Error::MethodNotAllowedForDirection));
    assert_eq!(inbox.last_error().map(|e| e.code()), Some(0x3000));
    reply.send().unwrap();

    inbox.check_for_new_frame().unwrap();
    assert_eq!(
        [inbox.next_byte(), inbox.next_byte(), inbox.next_byte()],
        [0x10, 0x20, 0x30]
    );
    assert!(!inbox.has_data());
}
