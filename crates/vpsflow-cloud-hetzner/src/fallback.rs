//! Built-in catalog used when the API cannot be reached or no token is set

use crate::model::{Image, Location, ServerType};

pub fn server_types() -> Vec<ServerType> {
    vec![
        ServerType::new("cpx11", 2, 2.0, 40.0, "3.92"),
        ServerType::new("cpx21", 3, 4.0, 80.0, "8.21"),
        ServerType::new("cpx31", 4, 8.0, 160.0, "16.54"),
    ]
}

pub fn locations() -> Vec<Location> {
    vec![
        Location::new("fsn1", "Falkenstein", "DE"),
        Location::new("nbg1", "Nuremberg", "DE"),
        Location::new("hel1", "Helsinki", "FI"),
        Location::new("ash", "Ashburn", "US"),
        Location::new("hil", "Hillsboro", "US"),
    ]
}

pub fn images() -> Vec<Image> {
    vec![
        Image::system("ubuntu-20.04", "Ubuntu 20.04"),
        Image::system("ubuntu-22.04", "Ubuntu 22.04"),
        Image::system("debian-11", "Debian 11"),
        Image::system("centos-7", "CentOS 7"),
        Image::system("fedora-36", "Fedora 36"),
    ]
}
