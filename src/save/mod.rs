mod bridge;
mod codec;
mod model;

pub use bridge::{apply_save_data, save_data_from_simulation};
pub use codec::{export_to_base64, import_from_base64, load_from_json_string, save_to_json_string};
pub use model::{SAVE_VERSION, SaveBuyable, SaveData, SaveResource, SaveUpgrade};
