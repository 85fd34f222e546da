// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Tag values of the variable-length entry list

pub const PARENT_FOLDER_NAME: u16 = 0;
pub const FOLDER_ID_CHAIN: u16 = 1;
/// Colon-separated path whose first component is the volume name
pub const HFS_PATH: u16 = 2;
pub const APPLESHARE_ZONE: u16 = 3;
pub const APPLESHARE_SERVER: u16 = 4;
pub const APPLESHARE_USER: u16 = 5;
pub const DRIVER_NAME: u16 = 6;
pub const NETWORK_MOUNT_INFO: u16 = 9;
pub const DIALUP_INFO: u16 = 10;
pub const UNICODE_TARGET_NAME: u16 = 14;
pub const UNICODE_VOLUME_NAME: u16 = 15;
pub const HIGH_RES_VOLUME_CREATED: u16 = 16;
pub const HIGH_RES_TARGET_CREATED: u16 = 17;
/// UTF-8 path of the target relative to its volume's mount point
pub const POSIX_PATH: u16 = 18;
/// UTF-8 absolute path of the volume's mount point
pub const POSIX_MOUNT_POINT: u16 = 19;
pub const DISK_IMAGE_ALIAS: u16 = 20;
pub const USER_HOME_PREFIX_LEN: u16 = 21;
pub const END_OF_LIST: u16 = 0xFFFF;

/// Human-readable name of a tag, if it is one this crate knows
pub fn name(tag: u16) -> Option<&'static str> {
    Some(match tag {
        PARENT_FOLDER_NAME => "parent-folder-name",
        FOLDER_ID_CHAIN => "folder-id-chain",
        HFS_PATH => "hfs-path",
        APPLESHARE_ZONE => "appleshare-zone",
        APPLESHARE_SERVER => "appleshare-server",
        APPLESHARE_USER => "appleshare-user",
        DRIVER_NAME => "driver-name",
        NETWORK_MOUNT_INFO => "network-mount-info",
        DIALUP_INFO => "dialup-info",
        UNICODE_TARGET_NAME => "unicode-target-name",
        UNICODE_VOLUME_NAME => "unicode-volume-name",
        HIGH_RES_VOLUME_CREATED => "high-res-volume-created",
        HIGH_RES_TARGET_CREATED => "high-res-target-created",
        POSIX_PATH => "posix-path",
        POSIX_MOUNT_POINT => "posix-mount-point",
        DISK_IMAGE_ALIAS => "disk-image-alias",
        USER_HOME_PREFIX_LEN => "user-home-prefix-length",
        END_OF_LIST => "end-of-list",
        _ => return None,
    })
}
