//! One resolution strategy per intent. Each returns the assistant payload and never
//! writes to the expense repository.

mod delete;
mod insert;
mod query;
mod update;

use crate::chat::error::ChatError;
use crate::chat::payload::ContentPayload;
use crate::chat::ChatService;

pub(crate) use insert::stage_insert;

pub const INSERT_PROMPT: &str = "Các khoản dưới đây đã được ghi nhận, bạn có muốn thêm không?";
pub const QUERY_PROMPT: &str =
    "Bạn đang muốn tìm kiếm các khoản thu chi theo các tiêu chí dưới đây, bạn có muốn tìm không?";
pub const UPDATE_PROMPT: &str =
    "Khoản thu chi dưới đây sẽ được sửa với các tham số dưới đây, bạn có chắc không?";
pub const UPDATE_NOT_FOUND: &str = "Không tìm thấy khoản thu chi có ID này, hãy kiểm tra lại.";
pub const UPDATE_MISSING_ID: &str = "Bạn cần cung cấp ID của khoản thu chi cần sửa.";
pub const DELETE_MISSING_CRITERIA: &str =
    "Bạn cần cung cấp (danh sách ID) hoặc (khoảng ngày) để xóa.";
pub const DELETE_NO_MATCH: &str = "Không tìm thấy khoản chi nào khớp với tiêu chí của bạn.";
pub const IMAGE_REJECTED: &str = "Hình ảnh không hợp lệ, vui lòng thử lại với hình ảnh khác.";

pub fn delete_prompt(count: usize) -> String {
    format!("Tìm thấy {count} khoản chi. Bạn có chắc chắn muốn xóa chúng không?")
}

impl ChatService {
    /// Messages outside the expense domain get a free-text answer.
    pub(crate) async fn resolve_other(&self, text: &str) -> Result<ContentPayload, ChatError> {
        let reply = self.extract(self.gateway.free_text_reply(text)).await?;
        Ok(ContentPayload::message(reply))
    }
}
