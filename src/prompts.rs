//! Fixed text shown to the model and to the user.

/// System instruction sent when a chat session is created.
pub const SYSTEM_INSTRUCTION: &str = r#"
Bạn là Trợ lý ảo AI chuyên trách tư vấn tuyển sinh cho Trường Đại học Bách khoa - Đại học Đà Nẵng (DUT - Da Nang University of Science and Technology).
Nhiệm vụ của bạn là giải đáp thắc mắc của học sinh, phụ huynh và sinh viên về các vấn đề liên quan đến nhà trường một cách thân thiện, chính xác và chuyên nghiệp.

Thông tin bối cảnh quan trọng:
- Tên trường: Trường Đại học Bách khoa - Đại học Đà Nẵng.
- Viết tắt: DUT hoặc ĐHBK-ĐHĐN.
- Màu sắc nhận diện: Xanh dương.
- Các nhóm ngành đào tạo chính: Công nghệ thông tin, Điện - Điện tử, Cơ khí, Xây dựng, Kiến trúc, Hóa học, Môi trường, Quản lý dự án, v.v.
- Phương thức tuyển sinh thường gặp: Xét tuyển thẳng, Xét kết quả thi THPT, Xét học bạ, Xét tuyển riêng.

Phong cách trả lời:
- Xưng hô: "Mình" (với bạn học sinh) hoặc "Ban tư vấn" (trang trọng hơn), gọi người dùng là "bạn" hoặc "quý phụ huynh" tùy ngữ cảnh.
- Giọng điệu: Nhiệt tình, khuyến khích, rõ ràng.
- Định dạng: Sử dụng Markdown (in đậm **từ khóa**, gạch đầu dòng) để dễ đọc.
- Nếu không biết chắc chắn thông tin (ví dụ: điểm chuẩn cụ thể của năm nay chưa công bố), hãy khuyên người dùng theo dõi website chính thức của trường (dut.udn.vn) hoặc fanpage tuyển sinh.

Tuyệt đối không bịa đặt số liệu cụ thể về học phí hoặc điểm chuẩn nếu không có trong dữ liệu huấn luyện chung, hãy đưa ra khoảng ước lượng hoặc hướng dẫn tra cứu.
"#;

/// Model message appended when a reply stream fails.
pub const APOLOGY: &str =
    "Xin lỗi, hiện tại hệ thống đang gặp sự cố kết nối. Vui lòng thử lại sau giây lát.";

/// Question asked before clearing a non-empty conversation.
pub const RESET_CONFIRMATION: &str =
    "Bắt đầu cuộc trò chuyện mới? Nội dung hiện tại sẽ bị xóa.";

pub const APP_TITLE: &str = "DUT Tư Vấn";

pub const WELCOME_TITLE: &str = "Xin chào!";

pub const WELCOME_TEXT: &str = "Mình là trợ lý ảo AI của trường ĐH Bách Khoa ĐN. \
Bạn cần tìm hiểu thông tin gì về trường hôm nay?";

pub const INPUT_PLACEHOLDER: &str = "Nhập câu hỏi của bạn...";

pub const DISCLAIMER: &str =
    "Trợ lý ảo có thể mắc sai sót. Vui lòng kiểm tra lại thông tin quan trọng.";

/// A canned prompt offered on the empty screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Suggestion {
    pub label: &'static str,
    pub prompt: &'static str,
}

pub const SUGGESTIONS: [Suggestion; 4] = [
    Suggestion {
        label: "Ngành HOT",
        prompt: "Các ngành đào tạo mũi nhọn của trường Đại học Bách khoa Đà Nẵng là gì?",
    },
    Suggestion {
        label: "Điểm chuẩn",
        prompt: "Cho mình biết điểm chuẩn năm ngoái của ngành Công nghệ thông tin.",
    },
    Suggestion {
        label: "Lịch xét tuyển",
        prompt: "Thời gian và phương thức xét tuyển học bạ năm nay như thế nào?",
    },
    Suggestion {
        label: "Học phí",
        prompt: "Mức học phí trung bình một kỳ học là bao nhiêu?",
    },
];

/// Look up a suggestion by its 1-based position.
pub fn suggestion(number: usize) -> Option<&'static Suggestion> {
    number.checked_sub(1).and_then(|index| SUGGESTIONS.get(index))
}

/// Sidebar entry: a label and where it points.
#[derive(Debug, Clone, Copy)]
pub struct SidebarEntry {
    pub label: &'static str,
    pub value: &'static str,
}

pub const SIDEBAR_LINKS: [SidebarEntry; 4] = [
    SidebarEntry { label: "Website chính thức", value: "http://dut.udn.vn" },
    SidebarEntry { label: "Cổng tuyển sinh", value: "http://tuyensinh.dut.udn.vn" },
    SidebarEntry { label: "Trang thông tin Sinh viên", value: "https://sv.dut.udn.vn/Default.aspx" },
    SidebarEntry { label: "Chương trình đào tạo", value: "http://dut.udn.vn/daotao" },
];

pub const SIDEBAR_CONTACTS: [SidebarEntry; 3] = [
    SidebarEntry { label: "Địa chỉ", value: "54 Nguyễn Lương Bằng, Q. Liên Chiểu, TP. Đà Nẵng" },
    SidebarEntry { label: "Điện thoại", value: "0236 3842 308" },
    SidebarEntry { label: "Fanpage DUT", value: "https://www.facebook.com/bachkhoaDUT" },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suggestions_are_numbered_from_one() {
        assert_eq!(suggestion(1).map(|s| s.label), Some("Ngành HOT"));
        assert_eq!(suggestion(4).map(|s| s.label), Some("Học phí"));
        assert!(suggestion(0).is_none());
        assert!(suggestion(5).is_none());
    }
}
